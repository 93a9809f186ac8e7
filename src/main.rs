//! Circle Evolve CLI - evolve a circle painting of an image.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use circle_evolve::{
    Canvas, EvolutionConfig, EvolutionEngine,
    compute::evolution::ReloadingFileSource,
    export::Exporter,
};

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <image>", program);
    eprintln!();
    eprintln!("Approximate an image with evolved circles.");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  image  Target image (PNG, JPEG, BMP or GIF)");
    eprintln!();
    eprintln!("Settings are read from <image stem>.evolve.json next to the image");
    eprintln!("when present. Print the defaults with --example-config.");
    std::process::exit(1);
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("circle-evolve");

    if args.len() != 2 {
        usage(program);
    }

    if args[1] == "--example-config" {
        print_example_config();
        return;
    }

    let image_path = PathBuf::from(&args[1]);
    let config = load_config(&image_path);

    let target = Canvas::open(&image_path).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let exporter = Exporter::new(
        config.report.clone(),
        target.size(),
        config.render_style(),
    );
    let watch = config.refresh_interval.is_some();

    let mut engine = EvolutionEngine::new(config, target).unwrap_or_else(|e| {
        eprintln!("Error in configuration: {}", e);
        std::process::exit(1);
    });
    if watch {
        engine = engine.with_target_source(Box::new(ReloadingFileSource::new(&image_path)));
    }

    let cancel = engine.cancel_handle();
    if let Err(e) = ctrlc::set_handler(move || cancel.store(true, Ordering::Relaxed)) {
        log::warn!("Could not install Ctrl-C handler: {}", e);
    }

    let result = engine.run_with_callback(|progress| {
        let parents: Vec<String> = progress
            .elite_scores
            .iter()
            .map(|s| format!("{:.0}", s))
            .collect();
        println!("Iteration {}\tParents: {}", progress.generation, parents.join(" "));

        if let Err(e) = exporter.export(&progress.best, progress.generation) {
            log::warn!("Export failed: {}", e);
        }
    });

    if let Err(e) = exporter.export(&result.best, result.stats.generations) {
        eprintln!("Error writing final artifacts: {}", e);
        std::process::exit(1);
    }

    println!();
    println!("Stopped: {:?}", result.stats.stop_reason);
    println!("Generations: {}", result.stats.generations);
    println!("Best score: {:.0}", result.stats.best_score);
    println!(
        "Time: {:.2}s ({:.1} evaluations/s)",
        result.stats.elapsed_seconds, result.stats.evaluations_per_second
    );
}

/// Read `<stem>.evolve.json` beside the image, or fall back to defaults.
fn load_config(image_path: &Path) -> EvolutionConfig {
    let config_path = image_path.with_extension("evolve.json");
    if !config_path.exists() {
        return EvolutionConfig::default();
    }

    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file {}: {}", config_path.display(), e);
        std::process::exit(1);
    });

    serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config {}: {}", config_path.display(), e);
        std::process::exit(1);
    })
}

fn print_example_config() {
    let config = EvolutionConfig::default();
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing config: {}", e);
            std::process::exit(1);
        }
    }
}
