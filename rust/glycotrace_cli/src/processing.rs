use super::cli::{
    MergeArgs,
    RunArgs,
    WorkerArgs,
    WriteTemplateArgs,
};
use super::config::Config;
use super::errors::CliError;
use glycoquery::TargetLibrary;
use glycoquery::serde::{
    read_library,
    read_sample,
};
use glycotrace::output::write_outputs;
use glycotrace::partition::{
    PartialStore,
    WorkerContext,
    merge_partials,
    wait_for_partials,
};
use glycotrace::scoring::PreparedSample;
use glycotrace::{
    AnalysisParameters,
    AnalysisTimings,
    prepare_samples,
};
use indicatif::{
    ProgressBar,
    ProgressStyle,
};
use std::time::{
    Duration,
    Instant,
};
use tracing::{
    info,
    warn,
};

const PARTIAL_POLL_INTERVAL: Duration = Duration::from_millis(500);

struct LoadedInputs {
    library: TargetLibrary,
    samples: Vec<PreparedSample>,
    params: AnalysisParameters,
}

fn load_inputs(config: &Config) -> Result<LoadedInputs, CliError> {
    let params = config.analysis.to_parameters()?;
    let input = config.input()?;

    let st = Instant::now();
    let library = read_library(&input.library)?;
    info!(
        "Loading library of {} glycans took: {:?} for {}",
        library.len(),
        st.elapsed(),
        input.library.display()
    );

    let runs = input
        .samples
        .iter()
        .map(|path| {
            let st = Instant::now();
            let run = read_sample(path)?;
            info!(
                "Loaded sample {} ({} spectra, {} MS1) in {:?}",
                run.name(),
                run.num_spectra(),
                run.num_ms1(),
                st.elapsed()
            );
            Ok(run)
        })
        .collect::<Result<Vec<_>, CliError>>()?;

    let samples = prepare_samples(
        runs,
        &params.rt_window,
        config.analysis.custom_noise.as_deref(),
    )?;
    Ok(LoadedInputs {
        library,
        samples,
        params,
    })
}

fn progress_bar(len: usize) -> Result<ProgressBar, CliError> {
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
    )
    .map_err(|e| CliError::Processing {
        source: e.to_string(),
    })?;
    Ok(ProgressBar::new(len as u64).with_style(style))
}

fn log_timings(timings: &AnalysisTimings) {
    info!(
        "Time spent: extraction {:?}, peak picking {:?}, scoring {:?} (total {:?})",
        timings.extraction,
        timings.peak_picking,
        timings.scoring,
        timings.total()
    );
}

fn merge_and_write(config: &Config, store: &PartialStore) -> Result<(), CliError> {
    let output = config.output()?;
    let merged = merge_partials(store, config.analysis.workers)?;
    if !merged.missing_workers.is_empty() {
        warn!(
            "Results are incomplete, missing workers: {:?}",
            merged.missing_workers
        );
    }
    log_timings(&merged.timings);
    write_outputs(&merged, &output.directory)?;
    Ok(())
}

pub fn main_run(args: RunArgs) -> Result<(), CliError> {
    let mut config = Config::from_file(&args.input.config)?;
    config.apply_overrides(&args.input);
    info!("Parsed configuration: {:#?}", config);

    let inputs = load_inputs(&config)?;
    let store = PartialStore::new(config.partials_dir()?)?;
    info!("Partial results go to {}", store.dir().display());
    let ctx = WorkerContext {
        library: &inputs.library,
        samples: &inputs.samples,
        params: &inputs.params,
        store: &store,
        n_workers: config.analysis.workers,
        stagger: Duration::from_millis(config.analysis.stagger_ms),
    };

    let st = Instant::now();
    let pb = progress_bar(inputs.library.len())?;
    let acc = ctx.run_workers(Some(&pb));
    pb.finish();
    info!(
        "{} of {} workers finished in {:?}",
        acc.reports.len(),
        config.analysis.workers,
        st.elapsed()
    );

    merge_and_write(&config, &store)
}

pub fn main_worker(args: WorkerArgs) -> Result<(), CliError> {
    let mut config = Config::from_file(&args.input.config)?;
    config.apply_overrides(&args.input);

    let inputs = load_inputs(&config)?;
    let store = PartialStore::new(config.partials_dir()?)?;
    let ctx = WorkerContext {
        library: &inputs.library,
        samples: &inputs.samples,
        params: &inputs.params,
        store: &store,
        n_workers: config.analysis.workers,
        stagger: Duration::from_millis(config.analysis.stagger_ms),
    };

    let (report, timings) = ctx.run_worker(args.worker_index, None)?;
    info!(
        "Wrote partial result of worker {} ({} glycans, {} peaks) to {}",
        report.worker_index,
        report.num_glycans,
        report.num_peaks,
        report.path.display()
    );
    log_timings(&timings);
    Ok(())
}

pub fn main_merge(args: MergeArgs) -> Result<(), CliError> {
    let mut config = Config::from_file(&args.config)?;
    config.apply_output_overrides(args.output_dir.as_ref(), args.workers);

    let store = PartialStore::new(config.partials_dir()?)?;
    let missing = wait_for_partials(
        &store,
        config.analysis.workers,
        Duration::from_secs(args.wait_secs),
        PARTIAL_POLL_INTERVAL,
    );
    if !missing.is_empty() {
        warn!(
            "Gave up waiting after {}s, merging without workers {:?}",
            args.wait_secs, missing
        );
    }
    merge_and_write(&config, &store)
}

pub fn main_write_template(args: WriteTemplateArgs) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(&Config::template())
        .map_err(|e| CliError::ParseError { msg: e.to_string() })?;
    if let Some(parent) = args.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| CliError::io(e, parent))?;
        }
    }
    std::fs::write(&args.output_path, text).map_err(|e| CliError::io(e, &args.output_path))?;
    info!("Wrote config template to: {}", args.output_path.display());
    Ok(())
}
