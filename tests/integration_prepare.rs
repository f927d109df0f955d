//! Integration tests for the preparation pipeline
//!
//! These tests drive the public API from raw snapshot files on disk to the
//! artifacts a dashboard would read back, in both artifact formats.

use geocode_prep::config::ArtifactFormat;
use geocode_prep::{GeoLookup, PrepConfig, PrepError, PrepPipeline, Source, StructureDataReader};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary raw/prepared layout for one test
fn create_dirs() -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let raw_dir = temp_dir.path().join("raw");
    let prepared_dir = temp_dir.path().join("prepared");
    fs::create_dir_all(&raw_dir).unwrap();
    (temp_dir, raw_dir, prepared_dir)
}

fn config_for(raw_dir: &Path, prepared_dir: &Path, sources: Vec<Source>) -> PrepConfig {
    PrepConfig::default()
        .with_raw_dir(raw_dir)
        .with_prepared_dir(prepared_dir)
        .with_sources(sources)
        .with_workers(1)
        .without_progress()
}

#[tokio::test]
async fn test_postal_end_to_end() {
    let (_temp_dir, raw_dir, prepared_dir) = create_dirs();
    fs::write(
        raw_dir.join(Source::Insee.raw_file_name()),
        "Code_commune_INSEE;Nom_commune;coordonnees_gps\n75014;PARIS 14;48.83,2.33\n",
    )
    .unwrap();

    let config = config_for(&raw_dir, &prepared_dir, vec![Source::Insee]);
    let report = PrepPipeline::new(config).unwrap().run().await;
    assert!(report.is_success());

    let text = fs::read_to_string(prepared_dir.join("insee_codes.json")).unwrap();
    let lookup: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(lookup["lat"]["75014"], serde_json::json!(48.83));
    assert_eq!(lookup["lon"]["75014"], serde_json::json!(2.33));
    assert_eq!(lookup["Nom_commune"]["75014"], serde_json::json!("PARIS 14"));
    assert_eq!(lookup["coordonnees_gps"]["75014"], serde_json::json!("48.83,2.33"));
    assert!(lookup.get("Code_commune_INSEE").is_none());
}

#[tokio::test]
async fn test_airports_drop_rows_without_latitude() {
    let (_temp_dir, raw_dir, prepared_dir) = create_dirs();
    fs::write(
        raw_dir.join(Source::Iata.raw_file_name()),
        "name,latitude_deg,longitude_deg,iata_code\n\
         Charles de Gaulle,49.0128,2.55,CDG\n\
         Nowhere,,1.5,NWH\n",
    )
    .unwrap();

    let config = config_for(&raw_dir, &prepared_dir, vec![Source::Iata])
        .with_format(ArtifactFormat::Parquet);
    let report = PrepPipeline::new(config).unwrap().run().await;
    assert!(report.is_success());

    let lookup = GeoLookup::open(&prepared_dir, Source::Iata, ArtifactFormat::Parquet).unwrap();
    assert_eq!(lookup.coordinates("CDG"), Some((49.0128, 2.55)));
    assert!(lookup.get("NWH").is_none());
    assert_eq!(lookup.len(), 1);

    let cdg = lookup.get("CDG").unwrap();
    assert_eq!(cdg.extra.get("latitude_deg").map(String::as_str), Some("49.0128"));
}

#[tokio::test]
async fn test_rail_keys() {
    let (_temp_dir, raw_dir, prepared_dir) = create_dirs();
    fs::write(
        raw_dir.join(Source::Tvs.raw_file_name()),
        "TVS;Intitulé gare;WGS 84\nECO;Écommoy;47.8266,0.2733\n",
    )
    .unwrap();
    // Two station codes that only differ by their check digit share one key
    fs::write(
        raw_dir.join(Source::Uic.raw_file_name()),
        "CODE_UIC;LIBELLE;C_GEO;X_WGS84;Y_WGS84\n\
         1234561;Gare A;48.1,2.1;2.1;48.1\n\
         1234562;Gare B;48.2,2.2;2.2;48.2\n",
    )
    .unwrap();

    let config = config_for(&raw_dir, &prepared_dir, vec![Source::Uic, Source::Tvs]);
    let report = PrepPipeline::new(config).unwrap().run().await;
    assert!(report.is_success());

    let tvs = GeoLookup::open(&prepared_dir, Source::Tvs, ArtifactFormat::Json).unwrap();
    assert_eq!(tvs.coordinates("TR_FRECO"), Some((47.8266, 0.2733)));
    assert!(tvs.get("ECO").is_none());

    let uic = GeoLookup::open(&prepared_dir, Source::Uic, ArtifactFormat::Json).unwrap();
    assert_eq!(uic.len(), 1);
    assert_eq!(uic.coordinates("123456"), Some((48.2, 2.2)));
    assert_eq!(
        uic.get("123456").unwrap().extra.get("LIBELLE").map(String::as_str),
        Some("Gare B")
    );

    let stats = &report
        .succeeded()
        .find(|r| r.source == Source::Uic)
        .unwrap()
        .stats;
    assert_eq!(stats.keys_overwritten, 1);
}

#[tokio::test]
async fn test_missing_sources_reported_individually() {
    let (_temp_dir, raw_dir, prepared_dir) = create_dirs();

    let config = config_for(&raw_dir, &prepared_dir, Source::ALL.to_vec());
    let report = PrepPipeline::new(config).unwrap().run().await;

    assert_eq!(report.failure_count(), 4);
    for (_, error) in report.failed() {
        assert!(matches!(error, PrepError::MissingFile { .. }));
    }
    assert!(!prepared_dir.join("insee_codes.json").exists());
}

#[test]
fn test_lookup_of_missing_artifact() {
    let (_temp_dir, _raw_dir, prepared_dir) = create_dirs();

    let result = GeoLookup::open(&prepared_dir, Source::Tvs, ArtifactFormat::Json);

    assert!(matches!(result, Err(PrepError::MissingFile { .. })));
}

#[test]
fn test_structure_rows_by_year() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data_osfi.csv");
    fs::write(
        &path,
        "id,Année,Structure,Emissions\n\
         S001,2019,Lab A,12.5\n\
         S001,2020,Lab A,10.0\n\
         S002,2020,Lab B,3.2\n",
    )
    .unwrap();

    let reader = StructureDataReader::load(&path).unwrap();
    assert_eq!(reader.row_count(), 3);
    assert_eq!(reader.structure_data("S001", None).unwrap().height(), 2);
    assert_eq!(reader.structure_data("S001", Some(2020)).unwrap().height(), 1);
    assert_eq!(reader.structure_data("S999", None).unwrap().height(), 0);
}
