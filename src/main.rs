use std::{path::PathBuf, process::ExitCode};

use medscreen::{Archive, PipelineConfig, parse_archive, plan_slices, validate};

fn main() -> ExitCode {
    env_logger::init();

    let paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        eprintln!("usage: medscreen <archive.zip>...");
        return ExitCode::FAILURE;
    }

    let config = PipelineConfig::from_env();
    let mut failed = false;

    for path in paths {
        let archive = match Archive::from_path(&path) {
            Ok(archive) => archive,
            Err(err) => {
                log::error!("Failed to read {}: {err}", path.display());
                failed = true;
                continue;
            }
        };
        let name = &archive.name;

        let parsed = match parse_archive(&archive, &config) {
            Ok(parsed) => parsed,
            Err(err) => {
                println!("{name}: {err}");
                failed = true;
                continue;
            }
        };

        for (series_id, series) in &parsed.series {
            let metadata = series.metadata();
            let report = validate(metadata);
            let plan = plan_slices(metadata.num_frames);
            println!(
                "{name}\t{series_id}\t{}\t{}\t{}\tframes={}\tvalid={}\tsampled={}",
                metadata
                    .source_format
                    .map_or_else(|| "N/A".to_owned(), |f| f.to_string()),
                metadata.modality.as_deref().unwrap_or("N/A"),
                metadata.orientation,
                metadata.num_frames,
                report.overall_valid(),
                plan.len(),
            );
            for check in report.failures() {
                println!("  failed: {} ({})", check.name, check.detail);
            }
        }
        if parsed.skipped_entries > 0 {
            println!("  skipped entries: {}", parsed.skipped_entries);
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
