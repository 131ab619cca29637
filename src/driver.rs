use std::{
    io::Write,
    path::{Path, PathBuf},
};

use rayon::prelude::*;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    experiment::{dc_trial, space_trial, DcConfig, DcRow, SpaceConfig, SpaceRow},
    CcKind,
};

/// Loads a configuration file, choosing the format by extension.
pub fn load_config<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, Error> {
    let path = path.as_ref();
    let s = std::fs::read_to_string(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => Ok(serde_yaml::from_str(&s)?),
        Some("json") => Ok(serde_json::from_str(&s)?),
        _ => Err(Error::UnknownFormat(path.to_path_buf())),
    }
}

/// Runs seeds `0..seeds` of the data-center experiment, in parallel.
pub fn run_dc(cfg: &DcConfig, seeds: u64) -> Result<Vec<DcRow>, Error> {
    (0..seeds)
        .into_par_iter()
        .map(|seed| {
            tracing::info!(seed, "dc trial");
            DcRow::summarise(&dc_trial(cfg, seed), seed)
        })
        .collect()
}

/// Runs seeds `0..seeds` of the space-DC experiment for every congestion control, in parallel.
pub fn run_space(cfg: &SpaceConfig, seeds: u64) -> Result<Vec<SpaceRow>, Error> {
    let trials = CcKind::ALL
        .into_iter()
        .flat_map(|cc| (0..seeds).map(move |seed| (cc, seed)))
        .collect::<Vec<_>>();
    trials
        .into_par_iter()
        .map(|(cc, seed)| {
            tracing::info!(%cc, seed, "space trial");
            SpaceRow::summarise(&space_trial(cfg, cc, seed), cc, seed)
        })
        .collect()
}

/// Writes `rows` as a CSV table with a header taken from the row's field names.
pub fn write_csv<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<(), Error> {
    if rows.is_empty() {
        return Err(Error::NoRows);
    }
    put_rows(csv::Writer::from_path(path)?, rows)
}

pub fn write_rows<W: Write, T: Serialize>(w: W, rows: &[T]) -> Result<(), Error> {
    if rows.is_empty() {
        return Err(Error::NoRows);
    }
    put_rows(csv::Writer::from_writer(w), rows)
}

fn put_rows<W: Write, T: Serialize>(mut wtr: csv::Writer<W>, rows: &[T]) -> Result<(), Error> {
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serde error")]
    Json(#[from] serde_json::Error),

    #[error("YAML error")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error")]
    Csv(#[from] csv::Error),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("unrecognized config format: {}", .0.display())]
    UnknownFormat(PathBuf),

    #[error("trial produced no metrics")]
    NoMetrics,

    #[error("no results to write")]
    NoRows,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{Bytes, Millisecs};

    fn dc() -> DcConfig {
        DcConfig::builder()
            .dt(Millisecs::new(0.1))
            .duration(Millisecs::new(20.0))
            .buffer_pkts(300)
            .ecn_thresh_pkts(30)
            .rtt_base(Millisecs::new(0.1))
            .long_flows_per_cc(1)
            .short_lambda(100.0)
            .short_size(Bytes::new(10_000.0))
            .build()
    }

    #[test]
    fn rows_come_back_in_seed_order() -> anyhow::Result<()> {
        let rows = run_dc(&dc(), 4)?;
        let seeds = rows.iter().map(|r| r.seed).collect::<Vec<_>>();
        assert_eq!(seeds, [0, 1, 2, 3]);
        Ok(())
    }

    #[test]
    fn space_rows_cover_every_variant() -> anyhow::Result<()> {
        let cfg = SpaceConfig::builder()
            .dt(Millisecs::ONE)
            .duration(Millisecs::new(100.0))
            .buffer_pkts(300)
            .ecn_thresh_pkts(30)
            .rtt_base(Millisecs::new(200.0))
            .num_long_flows(1)
            .short_lambda(10.0)
            .short_size(Bytes::new(10_000.0))
            .build();
        let rows = run_space(&cfg, 2)?;
        let keys = rows.iter().map(|r| (r.cc, r.seed)).collect::<Vec<_>>();
        assert_eq!(
            keys,
            [
                (CcKind::Reno, 0),
                (CcKind::Reno, 1),
                (CcKind::Dctcp, 0),
                (CcKind::Dctcp, 1),
                (CcKind::SpaceCc, 0),
                (CcKind::SpaceCc, 1),
            ]
        );
        Ok(())
    }

    #[test]
    fn csv_has_header_and_rows() -> anyhow::Result<()> {
        let rows = run_dc(&dc(), 2)?;
        let mut buf = Vec::new();
        write_rows(&mut buf, &rows)?;
        let text = String::from_utf8(buf)?;
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "seed,mean_queue_delay_ms,p99_queue_delay_ms,mean_util,\
             reno_fct_p99_ms,dctcp_fct_p99_ms,num_short_flows"
        );
        assert!(lines[1].starts_with("0,"));
        assert!(lines[2].starts_with("1,"));
        Ok(())
    }

    #[test]
    fn empty_results_are_rejected() {
        let rows: Vec<DcRow> = Vec::new();
        assert!(matches!(write_rows(Vec::new(), &rows), Err(Error::NoRows)));
    }

    #[test]
    fn table_lands_on_disk() -> anyhow::Result<()> {
        let rows = run_dc(&dc(), 1)?;
        let path = std::env::temp_dir().join(format!("fluidcc-dc-{}.csv", std::process::id()));
        write_csv(&path, &rows)?;
        let text = std::fs::read_to_string(&path)?;
        std::fs::remove_file(&path)?;
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("seed,"));
        Ok(())
    }

    #[test]
    fn unwritable_path_is_a_csv_error() {
        let rows = run_dc(&dc(), 1).unwrap();
        let path = std::env::temp_dir().join("fluidcc-no-such-dir").join("dc.csv");
        assert!(matches!(write_csv(&path, &rows), Err(Error::Csv(_))));
    }

    #[test]
    fn unknown_extension() {
        let path = std::env::temp_dir().join("fluidcc-config.toml");
        std::fs::write(&path, "dt_ms = 1").unwrap();
        let res = load_config::<DcConfig>(&path);
        assert!(matches!(res, Err(Error::UnknownFormat(_))));
    }
}
