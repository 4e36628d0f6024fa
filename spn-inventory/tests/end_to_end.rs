// End-to-end: catalog snapshot on disk → batch analysis → lookup → export
use rust_decimal::Decimal;
use spn_inventory::query::{export_spn_details, export_spn_vehicles, query_rows};
use spn_inventory::{
    find_vehicles, Analyzer, LookupInputError, MappingStatus, PhysicalValue,
    SortDirection, SortState, SpnCatalog, VehicleInput, NOT_AVAILABLE,
};
use std::io::Write;

const CATALOG: &str = r#"[
    {
        "SPN_Number": 190,
        "PGN_DEC": 61444,
        "PGN_HEX": "0xF004",
        "PGN_Name": "Electronic Engine Controller 1",
        "SPN_Description": "Engine Speed",
        "Unit": "rpm",
        "Data_Length_Bytes": 2,
        "Start_Byte": 4,
        "Start_Bit": 0,
        "Bit_Length": 16,
        "Resolution": 0.125,
        "Offset": 0
    },
    {
        "SPN_Number": 91,
        "PGN_DEC": 61443,
        "SPN_Description": "Accelerator Pedal Position 1",
        "Unit": "%",
        "Start_Byte": 2,
        "Bit_Length": 8
    },
    {
        "SPN_Number": 84,
        "PGN_DEC": 65265,
        "PGN_HEX": "0xFEF1",
        "SPN_Description": "Wheel-Based Vehicle Speed",
        "Unit": "km/h",
        "Start_Byte": 2,
        "Bit_Length": 16,
        "Resolution": 0.00390625,
        "Offset": 0
    }
]"#;

fn load_catalog() -> SpnCatalog {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CATALOG.as_bytes()).unwrap();
    SpnCatalog::from_json_file(file.path()).unwrap()
}

#[test]
fn vehicle_scenario() {
    let _ = env_logger::builder().is_test(true).try_init();

    let catalog = load_catalog();
    assert_eq!(catalog.stats().num_spns, 3);

    let analyzer = Analyzer::new(&catalog);
    let analysis = analyzer.analyze(
        &VehicleInput::new("vehicle_a.csv")
            .with_name("A")
            .with_observations([61444u32, 61444, 61443]),
    );

    assert_eq!(analysis.total_pgn_messages, 3);
    assert_eq!(analysis.unique_pgn_count, 2);
    assert_eq!(analysis.unique_spn_count, 2);

    let speed = analysis.spn_details.iter().find(|d| d.spn() == 190).unwrap();
    assert!(speed.transform.is_some());
    assert_eq!(
        speed.physical_value(8000),
        PhysicalValue::Computed(Decimal::from(1000))
    );
    assert_eq!(speed.bit_range.to_string(), "24-39");

    let pedal = analysis.spn_details.iter().find(|d| d.spn() == 91).unwrap();
    assert_eq!(pedal.physical_value(100), PhysicalValue::Unavailable);
    assert_eq!(pedal.formula(), NOT_AVAILABLE);

    assert!(analysis
        .pgn_mappings
        .iter()
        .all(|m| m.status == MappingStatus::Mapped));
}

#[test]
fn batch_lookup_and_export() {
    let catalog = load_catalog();
    let analyzer = Analyzer::new(&catalog);

    let inputs = vec![
        VehicleInput::new("volvo_fh.csv").with_observations([61444u32, 65265, 65265]),
        VehicleInput::new("hino_300.csv").with_observations([61443u32]),
        VehicleInput::new("daf_xf.csv").with_observations(["0xF004", "99999"]),
        VehicleInput::new("empty.csv"),
    ];
    let batch = analyzer.analyze_batch(&inputs);

    let sum: usize = batch.vehicles.iter().map(|v| v.total_pgn_messages).sum();
    assert_eq!(batch.totals.total_pgn_count, sum);
    assert_eq!(batch.totals.total_pgn_count, 6);
    assert_eq!(batch.totals.total_spn_count, 2 + 1 + 1);
    assert_eq!(batch.totals.total_vehicles, 4);

    for v in &batch.vehicles {
        assert!(v.total_pgn_messages >= v.unique_pgn_count);
        assert_eq!(v.unique_spn_count, v.spn_details.len());
    }

    let lookup = find_vehicles("190", &batch.vehicles).unwrap();
    let brands: Vec<&str> = lookup.vehicles.iter().map(|v| v.brand.as_str()).collect();
    assert_eq!(brands, vec!["Volvo", "DAF"]);

    let table = export_spn_vehicles(&lookup);
    assert_eq!(table.columns, vec!["Vehicle/File", "Brand", "Source File"]);
    assert_eq!(table.rows[1][2].to_string(), "daf_xf.csv");

    assert_eq!(
        find_vehicles("abc", &batch.vehicles),
        Err(LookupInputError::NotANumber("abc".to_string()))
    );
    assert!(find_vehicles("4191", &batch.vehicles).unwrap().vehicles.is_empty());

    let volvo = &batch.vehicles[0];
    let rows = query_rows(
        &volvo.spn_details,
        "speed",
        &SortState::new("description", SortDirection::Desc),
    );
    let table = export_spn_details(rows, 3);
    let spns: Vec<String> = table.rows.iter().map(|r| r[0].to_string()).collect();
    assert_eq!(spns, vec!["84", "190"]);
}

