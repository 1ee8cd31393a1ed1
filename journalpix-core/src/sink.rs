//! Where the photographs of a completed entry end up.

use crate::dates::to_system_time;
use anyhow::{Context, Result, bail};
use chrono::NaiveDateTime;
use std::fs::{self, FileTimes, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::Command;

/// One photograph to persist, with the metadata it must carry.
#[derive(Debug, Clone, Copy)]
pub struct ImageRecord<'a> {
    pub file_name: &'a str,
    pub data: &'a [u8],
    pub caption: &'a str,
    /// Capture time, minute precision. Becomes the file's modification time.
    pub taken_at: NaiveDateTime,
}

pub trait ImageSink {
    /// Persists one image. Returns the path it was written to.
    fn write_image(&mut self, image: &ImageRecord<'_>) -> Result<PathBuf>;
}

/// Embeds captions through the external `exiftool` utility.
#[derive(Debug, Clone)]
pub struct Exiftool {
    pub program: String,
}

impl Exiftool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Writes `caption` into the IPTC `Caption-Abstract` tag of `path`, in place.
    pub fn tag_caption(&self, path: &Path, caption: &str) -> Result<()> {
        let status = Command::new(&self.program)
            .arg("-overwrite_original")
            .arg(format!("-iptc:Caption-Abstract={caption}"))
            .arg(path)
            .status()
            .with_context(|| format!("running '{}' (is it installed?)", self.program))?;
        if !status.success() {
            bail!(
                "'{}' exited with status {} while tagging {}",
                self.program,
                status,
                path.display()
            );
        }
        Ok(())
    }
}

/// Writes images into a directory, tags their caption and backdates them.
#[derive(Debug)]
pub struct FsImageSink {
    output_dir: PathBuf,
    tagger: Option<Exiftool>,
}

impl FsImageSink {
    /// Creates the sink, ensuring the output directory exists.
    ///
    /// With `tagger` set to `None` images are written and backdated but no
    /// caption is embedded.
    pub fn new(output_dir: PathBuf, tagger: Option<Exiftool>) -> Result<Self> {
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("creating output dir {}", output_dir.display()))?;
        Ok(Self { output_dir, tagger })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl ImageSink for FsImageSink {
    fn write_image(&mut self, image: &ImageRecord<'_>) -> Result<PathBuf> {
        let path = self.output_dir.join(image.file_name);

        fs::write(&path, image.data).with_context(|| format!("writing {}", path.display()))?;

        if let Some(tagger) = &self.tagger {
            tagger.tag_caption(&path, image.caption)?;
        }

        // Tagging rewrites the file, so the timestamp goes last.
        set_modified(&path, image.taken_at)?;

        tracing::info!(path = %path.display(), "wrote image");
        Ok(path)
    }
}

fn set_modified(path: &Path, taken_at: NaiveDateTime) -> Result<()> {
    let modified = to_system_time(taken_at)?;
    OpenOptions::new()
        .write(true)
        .open(path)
        .and_then(|file| file.set_times(FileTimes::new().set_modified(modified)))
        .with_context(|| format!("setting modification time of {}", path.display()))
}

/// Reports where images would go without touching the filesystem.
#[derive(Debug, Default)]
pub struct DryRunSink {
    output_dir: PathBuf,
}

impl DryRunSink {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }
}

impl ImageSink for DryRunSink {
    fn write_image(&mut self, image: &ImageRecord<'_>) -> Result<PathBuf> {
        let path = self.output_dir.join(image.file_name);
        tracing::info!(path = %path.display(), caption = image.caption, "would write image");
        Ok(path)
    }
}
