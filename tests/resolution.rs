use std::sync::Arc;

use chrono::NaiveDate;

use zip2county::{
    CountyLookupTable, CountyResolver, CrosswalkRecord, NOT_AVAILABLE, PrimarySource,
    ResolutionStats, ResolverConfig, SecondarySource, ZipRecord,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn crosswalk(zip: &str, region: &str, sub: &str, ratio: f64, end: NaiveDate) -> CrosswalkRecord {
    CrosswalkRecord {
        zip: zip.to_string(),
        region_code: region.to_string(),
        sub_region_code: sub.to_string(),
        residential_ratio: ratio,
        valid_end_date: end,
    }
}

fn primary_records() -> Vec<ZipRecord> {
    vec![
        ZipRecord::new("94110", "San Francisco County, CA"),
        ZipRecord::new("10001", "New York County, NY"),
        ZipRecord::new("94014", "San Mateo County, CA"),
    ]
}

fn crosswalk_records() -> Vec<CrosswalkRecord> {
    vec![
        // Majority county for a gap ZIP
        crosswalk("91436", "06", "037", 0.65, date(2019, 1, 1)),
        crosswalk("91436", "06", "111", 0.35, date(2019, 1, 1)),
        // Older row with the higher ratio loses to the latest period
        crosswalk("93001", "06", "037", 0.90, date(2017, 12, 31)),
        crosswalk("93001", "06", "111", 0.60, date(2020, 6, 30)),
        // No majority anywhere
        crosswalk("95001", "06", "087", 0.45, date(2021, 3, 31)),
        crosswalk("95001", "06", "085", 0.40, date(2021, 3, 31)),
        // Would contradict the primary table; primary must win
        crosswalk("94110", "06", "081", 1.0, date(2022, 1, 1)),
    ]
}

fn resolver(secondary: SecondarySource) -> CountyResolver {
    CountyResolver::with_sources(
        &ResolverConfig::default(),
        PrimarySource::InMemory(Arc::new(primary_records())),
        secondary,
    )
    .unwrap()
}

fn pairs(rows: &[zip2county::ResolvedZip]) -> Vec<(&str, &str)> {
    rows.iter()
        .map(|r| (r.zip.as_str(), r.county_and_state.as_str()))
        .collect()
}

#[tokio::test]
async fn test_end_to_end_with_crosswalk() {
    let resolver = resolver(SecondarySource::InMemory(Arc::new(crosswalk_records())));
    let requested = ["94110", "91436", "93001", "95001", "99999", "91436"];

    let resolution = resolver.resolve(&requested).await.unwrap();

    assert_eq!(
        pairs(&resolution.rows),
        vec![
            ("94110", "San Francisco County, CA"),
            ("91436", "Los Angeles County, CA"),
            ("93001", "Ventura County, CA"),
            ("95001", NOT_AVAILABLE),
            ("99999", NOT_AVAILABLE),
            ("91436", "Los Angeles County, CA"),
        ]
    );
    assert_eq!(
        resolution.stats,
        ResolutionStats {
            requested: 6,
            primary_hits: 1,
            gaps: 4,
            secondary_filled: 2,
            unresolved: 2,
        }
    );
}

#[tokio::test]
async fn test_primary_only_when_secondary_disabled() {
    let resolver = resolver(SecondarySource::Disabled);
    let resolution = resolver.resolve(&["94110", "99999"]).await.unwrap();

    assert_eq!(
        pairs(&resolution.rows),
        vec![("94110", "San Francisco County, CA"), ("99999", NOT_AVAILABLE)]
    );
    assert_eq!(resolution.stats.secondary_filled, 0);
}

#[tokio::test]
async fn test_secondary_failure_degrades_to_na() {
    let missing = std::env::temp_dir().join("zip2county-does-not-exist/crosswalk.csv");
    let resolver = resolver(SecondarySource::File(missing));

    let resolution = resolver.resolve(&["91436", "94014"]).await.unwrap();
    assert_eq!(
        pairs(&resolution.rows),
        vec![("91436", NOT_AVAILABLE), ("94014", "San Mateo County, CA")]
    );
}

#[tokio::test]
async fn test_primary_failure_is_an_error() {
    let resolver = CountyResolver::with_sources(
        &ResolverConfig::default(),
        PrimarySource::File(std::env::temp_dir().join("zip2county-does-not-exist/geo.csv")),
        SecondarySource::Disabled,
    )
    .unwrap();

    assert!(resolver.resolve(&["94110"]).await.is_err());
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let resolver = resolver(SecondarySource::InMemory(Arc::new(crosswalk_records())));
    let first = resolver.resolve(&["93001", "94110", "91436"]).await.unwrap();
    let second = resolver.resolve(&["93001", "94110", "91436"]).await.unwrap();
    assert_eq!(first, second);

    // A different ZIP list on the same resolver is computed afresh
    let other = resolver.resolve(&["95001"]).await.unwrap();
    assert_eq!(pairs(&other.rows), vec![("95001", NOT_AVAILABLE)]);
}

#[tokio::test]
async fn test_file_sources_and_cache() {
    let dir = std::env::temp_dir().join(format!("zip2county-it-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let geo = dir.join("geo-data.csv");
    let xwalk = dir.join("crosswalk.csv");
    std::fs::write(
        &geo,
        "state_fips,state,state_abbr,zipcode,county,city\n\
         06,California,CA,94110,San Francisco,San Francisco\n\
         06,California,CA,94014,San Mateo,Daly City\n\
         06,California,CA,94014,San Francisco,Daly City\n",
    )
    .unwrap();
    std::fs::write(
        &xwalk,
        "ZIP,COUNTY,RES_RATIO,VALID_END_DATE\n\
         91436,6037,0.65,2019-01-01\n\
         91436,6111,0.35,2019-01-01\n",
    )
    .unwrap();

    let resolver = CountyResolver::with_sources(
        &ResolverConfig::default(),
        PrimarySource::File(geo.clone()),
        SecondarySource::File(xwalk),
    )
    .unwrap();

    let resolution = resolver.resolve(&["94014", "91436"]).await.unwrap();
    assert_eq!(
        pairs(&resolution.rows),
        vec![
            // Duplicate primary ZIP: the later row wins
            ("94014", "San Francisco County, CA"),
            ("91436", "Los Angeles County, CA"),
        ]
    );

    // Cached primary table survives the file going away
    std::fs::remove_file(&geo).unwrap();
    let again = resolver.resolve(&["94110"]).await.unwrap();
    assert_eq!(pairs(&again.rows), vec![("94110", "San Francisco County, CA")]);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_custom_lookup_table() {
    let mut table = CountyLookupTable::new();
    table.insert_region("53", "WA", [("033", "King")]);

    let resolver = CountyResolver::with_sources(
        &ResolverConfig::default(),
        PrimarySource::InMemory(Arc::new(vec![])),
        SecondarySource::InMemory(Arc::new(vec![
            crosswalk("98101", "53", "033", 1.0, date(2023, 1, 1)),
            crosswalk("91436", "06", "037", 1.0, date(2023, 1, 1)),
        ])),
    )
    .unwrap()
    .with_lookup_table(table);

    let resolution = resolver.resolve(&["98101", "91436"]).await.unwrap();
    assert_eq!(
        pairs(&resolution.rows),
        vec![("98101", "King County, WA"), ("91436", NOT_AVAILABLE)]
    );
}

#[tokio::test]
async fn test_unpadded_request_resolves_through_crosswalk() {
    let dir = std::env::temp_dir().join(format!("zip2county-pad-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let xwalk = dir.join("crosswalk.csv");
    std::fs::write(
        &xwalk,
        "ZIP,COUNTY,RES_RATIO,VALID_END_DATE\n\
         1001,6037,0.9,2020-01-01\n",
    )
    .unwrap();

    let resolver = resolver(SecondarySource::File(xwalk));
    let resolution = resolver.resolve(&["1001", "01001"]).await;
    std::fs::remove_dir_all(&dir).ok();

    // Output keeps each token as requested
    assert_eq!(
        pairs(&resolution.unwrap().rows),
        vec![
            ("1001", "Los Angeles County, CA"),
            ("01001", "Los Angeles County, CA"),
        ]
    );
}
