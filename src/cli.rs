//! Headless mask maintenance: segment removal sweeps, class-code export, and pixel statistics.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::config;
use crate::error::{AppError, AppResult};
use crate::labels::LabelSet;
use crate::painter::MaskBuffer;
use crate::storage::{MaskStorage, StorageService};

#[derive(Debug, Parser)]
#[command(name = "labelpaint", version, about = "Segmentation mask tools")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Remove a segment from a mask and normalize the remaining pixels.
    Sweep {
        #[arg(long)]
        mask: PathBuf,
        #[arg(long)]
        labels: PathBuf,
        /// Label id of the segment to remove.
        #[arg(long)]
        remove: usize,
        #[arg(long, short)]
        output: PathBuf,
        /// Where to write the label list without the removed segment.
        #[arg(long)]
        labels_output: Option<PathBuf>,
    },
    /// Convert a color mask to a grayscale image of label ids.
    Raw {
        #[arg(long)]
        mask: PathBuf,
        #[arg(long)]
        labels: PathBuf,
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Regenerate the class-code image of every stored mask under the data root.
    RebuildRaw {
        #[arg(long)]
        labels: PathBuf,
        /// Overrides `data_root` from config.json.
        #[arg(long)]
        data_root: Option<PathBuf>,
    },
    /// Print the pixel count of each label.
    Stats {
        #[arg(long)]
        mask: PathBuf,
        #[arg(long)]
        labels: PathBuf,
    },
}

pub fn execute(cli: Cli) -> AppResult<()> {
    match cli.command {
        Command::Sweep {
            mask,
            labels,
            remove,
            output,
            labels_output,
        } => {
            let mut labels = read_labels(&labels)?;
            let mut buffer = read_mask(&mask)?;

            let removed = labels.remove(remove)?;
            let report = buffer.sweep_remove_class(removed.color, &labels.colors());
            write_file(&output, &buffer.export()?)?;
            if let Some(path) = labels_output {
                write_file(&path, labels.to_json()?.as_bytes())?;
            }

            println!(
                "removed '{}' ({}): {} class pixels, {} fringe, {} orphaned",
                removed.name,
                removed.color,
                report.cleared_removed,
                report.cleared_fringe,
                report.cleared_orphaned
            );
        }
        Command::Raw {
            mask,
            labels,
            output,
        } => {
            let labels = read_labels(&labels)?;
            let buffer = read_mask(&mask)?;
            let codes = buffer.to_class_codes(&labels);
            codes
                .save_with_format(&output, image::ImageFormat::Png)
                .map_err(|err| AppError::Storage(err.into()))?;
            println!("wrote class codes to {}", output.display());
        }
        Command::RebuildRaw { labels, data_root } => {
            let labels = read_labels(&labels)?;
            let storage = match data_root.or(config::load_app_config().data_root) {
                Some(root) => StorageService::with_root(root),
                None => StorageService::with_default_root()?,
            };
            let rebuilt = rebuild_class_codes(&storage, &labels)?;
            println!(
                "rebuilt {rebuilt} class-code masks in {}",
                storage.raw_labels_dir().display()
            );
        }
        Command::Stats { mask, labels } => {
            let labels = read_labels(&labels)?;
            let buffer = read_mask(&mask)?;
            let total = buffer.bounds().pixel_count();
            for (label, count) in labels.iter().zip(buffer.class_histogram(&labels)) {
                let share = if total == 0 {
                    0.0
                } else {
                    count as f64 * 100.0 / total as f64
                };
                println!(
                    "{}\t{}\t{}\t{}\t{:.2}%",
                    label.id, label.name, label.color, count, share
                );
            }
        }
    }
    Ok(())
}

fn rebuild_class_codes(storage: &StorageService, labels: &LabelSet) -> AppResult<usize> {
    let labels_dir = storage.labels_dir();
    let entries = fs::read_dir(&labels_dir)
        .map_err(|err| AppError::io(format!("listing {}", labels_dir.display()), err))?;

    let mut rebuilt = 0;
    for entry in entries {
        let entry = entry.map_err(|err| AppError::io("reading labels directory", err))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.ends_with(".png") {
            continue;
        }
        let Some(encoded) = storage.load_existing_mask(name)? else {
            continue;
        };

        match MaskBuffer::decode(&encoded) {
            Ok(buffer) => {
                storage.save_class_codes(name, &buffer.to_class_codes(labels))?;
                rebuilt += 1;
            }
            Err(err) => tracing::warn!(mask = name, %err, "skipping undecodable mask"),
        }
    }
    Ok(rebuilt)
}

fn read_labels(path: &Path) -> AppResult<LabelSet> {
    let json = fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("reading labels {}", path.display()), err))?;
    Ok(LabelSet::from_json(&json)?)
}

fn read_mask(path: &Path) -> AppResult<MaskBuffer> {
    let bytes = fs::read(path)
        .map_err(|err| AppError::io(format!("reading mask {}", path.display()), err))?;
    Ok(MaskBuffer::decode(&bytes)?)
}

fn write_file(path: &Path, bytes: &[u8]) -> AppResult<()> {
    fs::write(path, bytes).map_err(|err| AppError::io(format!("writing {}", path.display()), err))
}
