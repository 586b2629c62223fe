//! The cleaning job: download, filter, normalize, upload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

use crate::artifact::{validate_name, Artifact, ArtifactVersion};
use crate::cli::CleanArgs;
use crate::config::{AppConfig, CleaningSettings};
use crate::error::{CleaningError, CleaningResult};
use crate::parsing::{read_table, write_table};
use crate::store::ArtifactStore;
use crate::tracking::Run;
use crate::transformations::{
    ensure_numeric, filter_by_price, parse_datetime_column, validate_schema, PriceRange,
};

/// Outcome of a successful cleaning run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningSummary {
    pub run_id: uuid::Uuid,
    pub input_artifact: String,
    pub input_rows: usize,
    pub output_rows: usize,
    /// Non-empty date values that became null
    pub unparsed_dates: usize,
    pub output_path: PathBuf,
    pub output_artifact: ArtifactVersion,
}

impl CleaningSummary {
    /// Values recorded in the run summary.
    pub fn to_run_summary(&self) -> Map<String, Value> {
        let mut summary = Map::new();
        summary.insert("input_artifact".to_string(), Value::from(self.input_artifact.clone()));
        summary.insert("input_rows".to_string(), Value::from(self.input_rows));
        summary.insert("output_rows".to_string(), Value::from(self.output_rows));
        summary.insert("unparsed_dates".to_string(), Value::from(self.unparsed_dates));
        summary.insert(
            "output_artifact".to_string(),
            Value::from(self.output_artifact.qualified_name()),
        );
        summary
    }
}

/// Runs the cleaning job against a tracking store.
pub struct Cleaner {
    store: Arc<dyn ArtifactStore>,
    settings: CleaningSettings,
    download_dir: PathBuf,
}

impl Cleaner {
    pub fn new(store: Arc<dyn ArtifactStore>, config: &AppConfig) -> Self {
        Self::with_settings(
            store,
            config.cleaning.clone(),
            config.store.download_dir.clone(),
        )
    }

    pub fn with_settings(
        store: Arc<dyn ArtifactStore>,
        settings: CleaningSettings,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            settings,
            download_dir: download_dir.into(),
        }
    }

    /// Execute one cleaning run and publish exactly one output artifact.
    ///
    /// Arguments are checked before the run is created. Once it exists, any
    /// failure marks the run as failed and is returned unchanged.
    pub async fn run(&self, args: &CleanArgs) -> CleaningResult<CleaningSummary> {
        let range = PriceRange::new(args.min_price, args.max_price)?;
        validate_name(&args.output_artifact)
            .map_err(|e| CleaningError::InvalidArguments(e.to_string()))?;

        let mut run = Run::init(
            Arc::clone(&self.store),
            &self.settings.job_type,
            self.download_dir.clone(),
        )
        .await?;
        let span = run.span().clone();

        let result = self
            .execute(&mut run, args, range)
            .instrument(span.clone())
            .await;

        match result {
            Ok(summary) => {
                run.finish(summary.to_run_summary()).instrument(span).await?;
                Ok(summary)
            }
            Err(e) => {
                if let Err(close_err) = run.fail(&e.to_string()).instrument(span).await {
                    warn!(error = %close_err, "Could not mark run as failed");
                }
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        run: &mut Run,
        args: &CleanArgs,
        range: PriceRange,
    ) -> CleaningResult<CleaningSummary> {
        let price = self.settings.price_column.as_str();
        let date = self.settings.date_column.as_str();

        run.update_config(args.to_config()).await?;

        info!("Downloading input file: {}", args.input_artifact);
        let input = run.use_artifact(&args.input_artifact).await?;
        let input_path = input.file().await?;

        let df = read_table(&input_path)?;
        validate_schema(&df, &[price, date])?;
        ensure_numeric(&df, price)?;
        let input_rows = df.height();

        info!(
            "Remove samples outside the range {} - {}",
            range.min(),
            range.max()
        );
        let filtered = filter_by_price(&df, price, range)?;
        info!(
            kept = filtered.height(),
            dropped = input_rows - filtered.height(),
            "Price filter applied"
        );

        info!("Convert {} field to datetime", date);
        let conversion = parse_datetime_column(&filtered, date)?;
        if conversion.unparsed > 0 {
            warn!(
                count = conversion.unparsed,
                "Unparseable {} values set to null", date
            );
        }
        if conversion.truncated > 0 {
            warn!(
                count = conversion.truncated,
                "{} values truncated to millisecond precision", date
            );
        }
        let mut cleaned = conversion.dataframe;
        let output_rows = cleaned.height();

        let output_path = self.settings.output_file.clone();
        write_table(&mut cleaned, &output_path, conversion.output_format)?;

        info!("Upload dataset after basic data cleaning");
        let mut artifact = Artifact::new(
            args.output_artifact.as_str(),
            args.output_type.as_str(),
            args.output_description.as_str(),
        );
        artifact.add_file(&output_path)?;
        let output_artifact = run.log_artifact(&artifact).await?;
        info!(artifact = %output_artifact.qualified_name(), "Artifact logged");

        Ok(CleaningSummary {
            run_id: run.id(),
            input_artifact: input.version().qualified_name(),
            input_rows,
            output_rows,
            unparsed_dates: conversion.unparsed,
            output_path,
            output_artifact,
        })
    }
}
