//! Naming convention behavior through the public API.

use std::cmp::Ordering;

use imap_data_access::naming::{
    compare_data_levels, compare_versions, is_valid_data_level, is_valid_extension,
    is_valid_instrument, ArchiveFile, Field,
};
use imap_data_access::{FileFields, QueryError, QueryFilters, QueryParams, ScienceFilePath};

#[test]
fn construct_parse_and_store() {
    let fields = FileFields {
        instrument: "swe".into(),
        data_level: "l0".into(),
        descriptor: Some("sci".into()),
        start_date: "20240105".into(),
        version: "v001".into(),
        extension: Some("pkts".into()),
        ..FileFields::default()
    };

    let filename = ScienceFilePath::construct(&fields).unwrap();
    assert_eq!(filename, "imap_swe_l0_sci_20240105_v001.pkts");

    let record = ScienceFilePath::parse(&filename).unwrap();
    assert_eq!(
        ScienceFilePath::to_storage_path(&record),
        "swe/l0/2024/01/imap_swe_l0_sci_20240105_v001.pkts"
    );
    assert_eq!(record.to_fields(), fields);
}

#[test]
fn fields_from_json_interchange() {
    let fields: FileFields = serde_json::from_str(
        r#"{"instrument":"hi","data_level":"l2","descriptor":"sensor45",
            "start_date":"20250101","repointing":12,"version":"v002"}"#,
    )
    .unwrap();
    assert_eq!(
        ScienceFilePath::construct(&fields).unwrap(),
        "imap_hi_l2_sensor45_20250101-repoint00012_v002.cdf"
    );
}

#[test]
fn every_problem_reported_at_once() {
    let fields = FileFields {
        instrument: "xyz".into(),
        data_level: "l1a".into(),
        start_date: "20240230".into(),
        version: "1".into(),
        ..FileFields::default()
    };
    let err = ScienceFilePath::construct(&fields).unwrap_err();
    for field in [Field::Instrument, Field::StartDate, Field::Version] {
        assert!(err.has(field), "missing {field} error in {err}");
    }
    assert!(!err.is_semantic_only());
    assert!(err.to_string().contains("instrument"));
}

#[test]
fn grammar_predicates() {
    assert!(is_valid_instrument("codice"));
    assert!(!is_valid_instrument("CODICE"));
    assert!(is_valid_data_level("l1b"));
    assert!(!is_valid_data_level("l4"));
    assert!(is_valid_extension("pkts", "l0"));
    assert!(!is_valid_extension("pkts", "l1a"));
    assert!(is_valid_extension("cdf", "l2"));

    assert_eq!(compare_versions("v010", "v009").unwrap(), Ordering::Greater);
    assert!(compare_versions("v010", "10").is_err());
    assert_eq!(compare_data_levels("l1a", "l2").unwrap(), Ordering::Less);
}

#[test]
fn archive_files_of_every_kind() {
    let science = ArchiveFile::parse("imap_swe_l0_sci_20240105_v001.pkts").unwrap();
    assert_eq!(
        science.archive_path(),
        "imap/swe/l0/2024/01/imap_swe_l0_sci_20240105_v001.pkts"
    );

    let spice = ArchiveFile::parse("imap_sclk_0000.tsc").unwrap();
    assert_eq!(spice.archive_path(), "imap/spice/sclk/imap_sclk_0000.tsc");

    assert!(ArchiveFile::parse("notes.md").is_err());
}

#[test]
fn reversed_date_filters_rejected_before_any_request() {
    let err = QueryParams::normalize(&QueryFilters {
        start_date: Some("20241231".into()),
        end_date: Some("20240101".into()),
        ..QueryFilters::default()
    })
    .unwrap_err();
    match err {
        QueryError::Invalid(errors) => assert!(errors.has(Field::EndDate)),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn filename_seeds_query_filters() {
    let filters =
        QueryFilters::from_filename("imap_swe_l1a_sci_20240105-repoint00003_v002.cdf").unwrap();
    let params = QueryParams::normalize(&filters).unwrap();
    assert_eq!(
        params.query_string(),
        "instrument=swe&data_level=l1a&descriptor=sci&start_date=20240105\
         &repointing=repoint00003&version=v002&extension=cdf"
    );
}
