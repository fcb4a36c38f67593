// SYNOID Shorts Collaborators
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Contracts for the services that produce raw media, plus the default
// adapters: Pollinations (Hugging Face as backup) for stills and the
// edge-tts CLI for narration.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};
use url::Url;

const IMAGE_TIMEOUT_SECS: u64 = 120;
const HF_SDXL_URL: &str =
    "https://api-inference.huggingface.co/models/stabilityai/stable-diffusion-xl-base-1.0";

/// Produces a still for a prompt at `out`.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch_image(&self, prompt: &str, out: &Path) -> Result<()>;
}

/// Produces narration for `text` at `out`. The file must have a readable
/// duration.
#[async_trait]
pub trait VoiceSynth: Send + Sync {
    async fn synthesize(&self, text: &str, out: &Path) -> Result<()>;
}

pub fn enhance_prompt(prompt: &str) -> String {
    format!(
        "{}, cinematic lighting, award winning photography, 8k, highly detailed, photorealistic",
        prompt.trim()
    )
}

pub struct PollinationsImages {
    client: reqwest::Client,
    base_url: String,
    hf_token: Option<String>,
    attempts: u32,
    backoff: Duration,
}

impl PollinationsImages {
    pub fn new(base_url: impl Into<String>, hf_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            hf_token,
            attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }

    /// Portrait-sized request URL for `prompt`.
    pub fn image_url(&self, prompt: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid image API base {:?}", self.base_url))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow!("image API base cannot take a path: {}", self.base_url))?;
            segments.pop_if_empty().push(&enhance_prompt(prompt));
        }
        url.query_pairs_mut()
            .append_pair("width", "1080")
            .append_pair("height", "1920")
            .append_pair("model", "flux")
            .append_pair("nologo", "true");
        Ok(url)
    }

    async fn fetch_backup(&self, token: &str, prompt: &str, out: &Path) -> Result<()> {
        let payload = json!({
            "inputs": format!("{}, cinematic lighting, 8k, photorealistic", prompt.trim()),
            "parameters": { "negative_prompt": "blurry, cartoon, illustration, low quality" }
        });
        let resp = self
            .client
            .post(HF_SDXL_URL)
            .bearer_auth(token)
            .json(&payload)
            .timeout(Duration::from_secs(IMAGE_TIMEOUT_SECS))
            .send()
            .await?;
        if !resp.status().is_success() {
            bail!("Hugging Face returned {}", resp.status());
        }
        let bytes = resp.bytes().await?;
        tokio::fs::write(out, &bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl ImageSource for PollinationsImages {
    async fn fetch_image(&self, prompt: &str, out: &Path) -> Result<()> {
        let url = self.image_url(prompt)?;
        let short: String = prompt.chars().take(50).collect();
        info!("[IMAGES] Generating image for prompt: {}...", short);

        for attempt in 1..=self.attempts {
            match self
                .client
                .get(url.clone())
                .timeout(Duration::from_secs(IMAGE_TIMEOUT_SECS))
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => {
                    let bytes = resp.bytes().await?;
                    tokio::fs::write(out, &bytes)
                        .await
                        .with_context(|| format!("writing image {:?}", out))?;
                    return Ok(());
                }
                Ok(resp) => warn!(
                    "[IMAGES] Attempt {}/{}: API status {}",
                    attempt,
                    self.attempts,
                    resp.status()
                ),
                Err(e) => warn!("[IMAGES] Attempt {}/{}: {}", attempt, self.attempts, e),
            }
            tokio::time::sleep(self.backoff).await;
        }

        match &self.hf_token {
            Some(token) => {
                warn!("[IMAGES] ⚠️ Pollinations failed, trying Hugging Face backup...");
                self.fetch_backup(token, prompt, out)
                    .await
                    .context("all image providers failed")?;
                info!("[IMAGES] ✅ Backup successful (Hugging Face)");
                Ok(())
            }
            None => bail!("image generation failed and no HF_TOKEN is set for the backup"),
        }
    }
}

/// Drives the `edge-tts` command line tool.
pub struct EdgeTts {
    bin: String,
    voice: String,
}

impl EdgeTts {
    pub fn new(bin: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            voice: voice.into(),
        }
    }
}

#[async_trait]
impl VoiceSynth for EdgeTts {
    async fn synthesize(&self, text: &str, out: &Path) -> Result<()> {
        let short: String = text.chars().take(30).collect();
        info!("[VOICE] Generating audio for text: {}...", short);

        let output = Command::new(&self.bin)
            .arg("--voice")
            .arg(&self.voice)
            .arg("--text")
            .arg(text)
            .arg("--write-media")
            .arg(out)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("could not run {}", self.bin))?;

        if !output.status.success() {
            bail!(
                "{} failed: {}",
                self.bin,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let written = tokio::fs::metadata(out).await.map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            bail!("{} produced no audio at {:?}", self.bin, out);
        }
        Ok(())
    }
}
