use crate::cohort::{FeatureSummary, Imputer, WindowDataset};
use crate::detection::OnsetResult;
use crate::error::AkiResult;
use crate::pipeline::RunSummary;
use std::path::Path;
use std::fs::File;
use log::info;

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// `id,onset_hour,aki,criterion`; onset hour is -1 for patients without AKI.
pub fn save_onset_labels<P: AsRef<Path>>(results: &[OnsetResult], path: P) -> AkiResult<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;

    writer.write_record(["id", "onset_hour", "aki", "criterion"])?;

    for result in results {
        let criterion = result.onset.map(|o| o.criterion.as_str()).unwrap_or("");
        writer.write_record([
            result.patient_id.clone(),
            result.onset_hour_or_sentinel().to_string(),
            u8::from(result.has_aki()).to_string(),
            criterion.to_string(),
        ])?;
    }

    writer.flush()?;
    info!("Wrote {} onset labels to {:?}", results.len(), path.as_ref());
    Ok(())
}

/// Writes the raw window table, its median-imputed counterpart and the label table.
pub fn save_window_dataset<P: AsRef<Path>>(
    dataset: &WindowDataset,
    imputer: &dyn Imputer,
    output_dir: P,
    cohort_name: &str,
) -> AkiResult<()> {
    let dir = output_dir.as_ref();
    let hours = dataset.window_hours;

    save_feature_rows(
        dataset,
        dataset.rows.iter().map(|row| row.iter().map(|&v| cell(v)).collect()),
        dir.join(format!("{}_window_{}.csv", cohort_name, hours)),
    )?;

    let imputed = dataset.impute(imputer)?;
    save_feature_rows(
        dataset,
        imputed.iter().map(|row| row.iter().map(|v| v.to_string()).collect()),
        dir.join(format!("{}_window_{}_imputed.csv", cohort_name, hours)),
    )?;

    save_window_labels(dataset, dir.join(format!("{}_labels_{}.csv", cohort_name, hours)))?;

    info!("Saved {}h {} window ({} patients) to {:?}", hours, cohort_name, dataset.len(), dir);
    Ok(())
}

fn save_feature_rows<P, I>(dataset: &WindowDataset, rows: I, path: P) -> AkiResult<()>
where
    P: AsRef<Path>,
    I: Iterator<Item = Vec<String>>,
{
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["id".to_string()];
    header.extend(dataset.columns.iter().cloned());
    writer.write_record(&header)?;

    for (id, row) in dataset.ids.iter().zip(rows) {
        let mut record = vec![id.clone()];
        record.extend(row);
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

fn save_window_labels<P: AsRef<Path>>(dataset: &WindowDataset, path: P) -> AkiResult<()> {
    let mut writer = csv::Writer::from_path(path)?;

    writer.write_record(["id", "label"])?;

    for (id, label) in dataset.ids.iter().zip(&dataset.labels) {
        writer.write_record([id.clone(), label.to_string()])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn save_run_summary<P: AsRef<Path>>(summary: &RunSummary, path: P) -> AkiResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, summary)?;
    Ok(())
}

/// `feature,min,max,mean,median,std,missing`; undefined statistics are left empty.
pub fn save_feature_summary<P: AsRef<Path>>(summaries: &[FeatureSummary], path: P) -> AkiResult<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;

    writer.write_record(["feature", "min", "max", "mean", "median", "std", "missing"])?;

    for s in summaries {
        writer.write_record([
            s.feature.clone(),
            cell(s.min),
            cell(s.max),
            cell(s.mean),
            cell(s.median),
            cell(s.std),
            s.missing.to_string(),
        ])?;
    }

    writer.flush()?;
    info!("Wrote statistics for {} features to {:?}", summaries.len(), path.as_ref());
    Ok(())
}
