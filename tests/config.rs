use std::path::PathBuf;

use fluidcc::{
    driver::{self, Error},
    experiment::{DcConfig, SpaceConfig},
    units::{Bytes, Millisecs},
};

fn shipped(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("configs").join(name)
}

#[test]
fn shipped_dc_config() -> anyhow::Result<()> {
    let cfg: DcConfig = driver::load_config(shipped("dc_config.yaml"))?;
    assert_eq!(cfg.dt, Millisecs::new(0.01));
    assert_eq!(cfg.duration, Millisecs::new(200.0));
    assert_eq!(cfg.buffer_pkts, 300);
    assert_eq!(cfg.ecn_thresh_pkts, 30);
    assert_eq!(cfg.rtt_base, Millisecs::new(0.1));
    assert_eq!(cfg.long_flows_per_cc, 2);
    assert_eq!(cfg.short_lambda, 500.0);
    assert_eq!(cfg.short_size, Bytes::new(100_000.0));
    Ok(())
}

#[test]
fn shipped_space_config() -> anyhow::Result<()> {
    let cfg: SpaceConfig = driver::load_config(shipped("space_config.yaml"))?;
    assert_eq!(cfg.dt, Millisecs::ONE);
    assert_eq!(cfg.rtt_base, Millisecs::new(200.0));
    assert_eq!(cfg.num_long_flows, 4);
    assert_eq!(cfg.outage_prob_per_sec, 0.1);
    assert_eq!(cfg.outage_duration, Millisecs::new(1_000.0));
    assert_eq!(cfg.rtt_jitter_std, Millisecs::new(50.0));
    Ok(())
}

#[test]
fn json_config_with_defaults() -> anyhow::Result<()> {
    let path = std::env::temp_dir().join(format!("fluidcc-space-{}.json", std::process::id()));
    std::fs::write(
        &path,
        r#"{
            "dt_ms": 1.0,
            "duration_ms": 500.0,
            "buffer_pkts": 100,
            "ecn_thresh_pkts": 10,
            "rtt_base_ms": 50.0,
            "num_long_flows": 1,
            "short_lambda": 4.0,
            "short_size_bytes": 20000
        }"#,
    )?;
    let cfg: SpaceConfig = driver::load_config(&path)?;
    std::fs::remove_file(&path)?;

    let expected = SpaceConfig::builder()
        .dt(Millisecs::ONE)
        .duration(Millisecs::new(500.0))
        .buffer_pkts(100)
        .ecn_thresh_pkts(10)
        .rtt_base(Millisecs::new(50.0))
        .num_long_flows(1)
        .short_lambda(4.0)
        .short_size(Bytes::new(20_000.0))
        .build();
    assert_eq!(cfg, expected);

    // The loaded config drives a full experiment
    let rows = driver::run_space(&cfg, 1)?;
    assert_eq!(rows.len(), 3);
    Ok(())
}

#[test]
fn missing_field_is_rejected() -> anyhow::Result<()> {
    let path = std::env::temp_dir().join(format!("fluidcc-dc-{}.yaml", std::process::id()));
    std::fs::write(&path, "dt_ms: 0.1\nduration_ms: 10.0\n")?;
    let res = driver::load_config::<DcConfig>(&path);
    std::fs::remove_file(&path)?;
    assert!(matches!(res, Err(Error::Yaml(_))));
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let res = driver::load_config::<DcConfig>(shipped("no_such_config.yaml"));
    assert!(matches!(res, Err(Error::Io(_))));
}
