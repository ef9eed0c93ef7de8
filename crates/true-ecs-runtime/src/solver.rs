//! Plate solving through nova.astrometry.net.
//!
//! [`WcsProvider`] is the seam the processor talks to; [`AstrometryClient`]
//! implements it against the astrometry.net web API: log in once, upload
//! the image, poll until a job finishes, then download its WCS file.

use anyhow::{Context, Result, bail};
use reqwest::blocking::{Client, multipart};
use serde::Deserialize;
use std::io::Write;
use std::path::Path;
use std::thread::sleep;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use true_ecs_core::{ScaleBounds, Settings, WcsSolution};

const HTTP_TIMEOUT: Duration = Duration::from_secs(120);
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Source of calibrated WCS solutions.
pub trait WcsProvider {
    /// Establish a session. Called once before any `solve`.
    fn authenticate(&mut self, api_key: &str) -> Result<()>;

    /// Plate-solve `image` and write the WCS calibration to `output`.
    ///
    /// `hints` narrows the search when present and is omitted otherwise.
    fn solve(&mut self, image: &Path, output: &Path, hints: Option<ScaleBounds>) -> Result<()>;
}

/// Job status from astrometry.net.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Job is queued or running.
    Processing,
    /// Job completed successfully.
    Success,
    /// Job failed.
    Failure,
}

/// Client for the astrometry.net API.
#[derive(Debug)]
pub struct AstrometryClient {
    base_url: String,
    session_key: Option<String>,
    solve_timeout: Option<Duration>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    status: String,
    session: Option<String>,
    #[serde(default)]
    errormessage: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    status: String,
    subid: Option<u64>,
    #[serde(default)]
    errormessage: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmissionStatusResponse {
    jobs: Option<Vec<Option<u64>>>,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: Option<String>,
}

impl AstrometryClient {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, solve_timeout: Option<Duration>) -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_key: None,
            solve_timeout,
            client,
        })
    }

    /// Create a client from the service options in the settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.astrometry_url.clone(),
            settings.solve_timeout.map(Duration::from_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Upload an image file and return the submission ID.
    pub fn upload_image(&self, image_path: &Path, hints: Option<ScaleBounds>) -> Result<u64> {
        let session = self
            .session_key
            .as_deref()
            .context("Not authenticated with the plate-solving service")?;

        let file_name = image_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let file_contents = std::fs::read(image_path)
            .with_context(|| format!("Failed to read image file: {}", image_path.display()))?;

        let form = multipart::Form::new()
            .text("request-json", upload_request(session, hints).to_string())
            .part(
                "file",
                multipart::Part::bytes(file_contents)
                    .file_name(file_name)
                    .mime_str("application/octet-stream")?,
            );

        let upload_resp: UploadResponse = self
            .client
            .post(self.url("api/upload"))
            .multipart(form)
            .send()
            .context("Failed to upload image")?
            .json()
            .context("Failed to parse upload response")?;

        if upload_resp.status != "success" {
            bail!(
                "Upload failed: {}",
                upload_resp
                    .errormessage
                    .unwrap_or_else(|| "Unknown error".to_string())
            );
        }

        let subid = upload_resp.subid.context("No submission ID in response")?;
        tracing::info!("Uploaded {}, submission ID: {}", image_path.display(), subid);
        Ok(subid)
    }

    /// Get the job IDs started for a submission so far.
    pub fn get_submission_jobs(&self, submission_id: u64) -> Result<Vec<u64>> {
        let status: SubmissionStatusResponse = self
            .client
            .get(self.url(&format!("api/submissions/{}", submission_id)))
            .send()
            .context("Failed to get submission status")?
            .json()
            .context("Failed to parse submission status")?;

        Ok(status
            .jobs
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .collect())
    }

    /// Check the status of a job.
    pub fn get_job_status(&self, job_id: u64) -> Result<JobStatus> {
        let status: JobStatusResponse = self
            .client
            .get(self.url(&format!("api/jobs/{}", job_id)))
            .send()
            .context("Failed to get job status")?
            .json()
            .context("Failed to parse job status")?;

        Ok(parse_job_status(status.status.as_deref()))
    }

    /// Block until a job of the submission succeeds and return its ID.
    pub fn wait_for_job(&self, submission_id: u64) -> Result<u64> {
        let start = Instant::now();
        tracing::info!("Waiting for submission {} to be solved", submission_id);

        loop {
            if let Some(timeout) = self.solve_timeout {
                if start.elapsed() > timeout {
                    bail!(
                        "Timed out after {:?} waiting for submission {}",
                        timeout,
                        submission_id
                    );
                }
            }

            let mut statuses = Vec::new();
            for job_id in self.get_submission_jobs(submission_id)? {
                let status = self.get_job_status(job_id)?;
                tracing::debug!("Job {} status: {:?}", job_id, status);
                statuses.push((job_id, status));
            }

            match settle(&statuses) {
                Some(Ok(job_id)) => {
                    tracing::info!("Job {} solved", job_id);
                    return Ok(job_id);
                }
                Some(Err(())) => bail!("Plate solving failed for submission {}", submission_id),
                None => sleep(POLL_INTERVAL),
            }
        }
    }

    /// Download the WCS calibration of a solved job to `output`.
    pub fn download_wcs(&self, job_id: u64, output: &Path) -> Result<()> {
        let response = self
            .client
            .get(self.url(&format!("wcs_file/{}", job_id)))
            .send()
            .context("Failed to download WCS file")?;

        if !response.status().is_success() {
            bail!("Failed to download WCS file: HTTP {}", response.status());
        }

        let bytes = response.bytes().context("Failed to read WCS file bytes")?;
        store_wcs(&bytes, output)?;
        tracing::debug!("Wrote {} ({} bytes)", output.display(), bytes.len());
        Ok(())
    }
}

/// Move a downloaded WCS file into place once it reads as a calibration.
///
/// The bytes go to a temporary file beside `output` first, so a rejected or
/// interrupted download never replaces or creates `output`.
fn store_wcs(bytes: &[u8], output: &Path) -> Result<()> {
    if !bytes.starts_with(b"SIMPLE  =") {
        bail!("Downloaded WCS file is not a FITS file");
    }

    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;
    file.write_all(bytes)
        .and_then(|()| file.flush())
        .context("Failed to write the downloaded WCS file")?;

    WcsSolution::read(file.path()).context("Downloaded WCS file is not a usable calibration")?;
    file.persist(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(())
}

impl WcsProvider for AstrometryClient {
    fn authenticate(&mut self, api_key: &str) -> Result<()> {
        let request_json = serde_json::json!({ "apikey": api_key });

        let login_resp: LoginResponse = self
            .client
            .post(self.url("api/login"))
            .form(&[("request-json", request_json.to_string())])
            .send()
            .context("Failed to send login request")?
            .json()
            .context("Failed to parse login response")?;

        if login_resp.status != "success" {
            bail!(
                "Login failed: {}",
                login_resp
                    .errormessage
                    .unwrap_or_else(|| "Unknown error".to_string())
            );
        }

        self.session_key = Some(login_resp.session.context("No session key in login response")?);
        tracing::info!("Logged in to {}", self.base_url);
        Ok(())
    }

    fn solve(&mut self, image: &Path, output: &Path, hints: Option<ScaleBounds>) -> Result<()> {
        let submission_id = self.upload_image(image, hints)?;
        let job_id = self.wait_for_job(submission_id)?;
        self.download_wcs(job_id, output)
    }
}

/// The `request-json` body of an upload.
fn upload_request(session: &str, hints: Option<ScaleBounds>) -> serde_json::Value {
    let mut request = serde_json::json!({
        "session": session,
        "publicly_visible": "n",
        "allow_modifications": "d",
        "allow_commercial_use": "d",
    });
    if let Some(bounds) = hints {
        request["scale_units"] = ScaleBounds::UNITS.into();
        request["scale_type"] = "ul".into();
        request["scale_lower"] = bounds.lower.into();
        request["scale_upper"] = bounds.upper.into();
    }
    request
}

fn parse_job_status(status: Option<&str>) -> JobStatus {
    match status {
        Some("success") => JobStatus::Success,
        Some("failure") => JobStatus::Failure,
        _ => JobStatus::Processing,
    }
}

/// `Some(Ok(job))` once a job succeeded, `Some(Err(()))` once every job
/// failed, `None` while still solving.
fn settle(statuses: &[(u64, JobStatus)]) -> Option<std::result::Result<u64, ()>> {
    if let Some((job_id, _)) = statuses.iter().find(|(_, s)| *s == JobStatus::Success) {
        return Some(Ok(*job_id));
    }
    if !statuses.is_empty() && statuses.iter().all(|(_, s)| *s == JobStatus::Failure) {
        return Some(Err(()));
    }
    None
}
