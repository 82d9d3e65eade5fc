// crates/mobility-lake-cli/tests/commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests running the mobility-lake binary.
// Purpose: Ensure every pass works end to end over a filesystem lake.
// Dependencies: mobility-lake-cli binary
// ============================================================================

//! ## Overview
//! Runs the CLI binary against a temporary filesystem lake with a `SQLite`
//! sink and checks outputs, exit codes and the relational copies.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use serde_json::Value;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const BICIMAD: &str = "\
id,usuario_id,tipo_usuario,estacion_origen,estacion_destino,fecha_hora_inicio,fecha_hora_fin,\
duracion_segundos,distancia_km,calorias_estimadas,co2_evitado_gramos
1,10,anual,1,2,2024-03-15 08:00:00,2024-03-15 08:10:00,600,2.0,40,200
2,11,Anual,1,2,2024-03-15 09:00:00,2024-03-15 09:20:00,1200,4.0,80,400
3,12,ocasional,1,2,2024-03-16 10:00:00,2024-03-16 10:15:00,900,3.0,60,300
";

const TRAFICO: &str = "\
sensor_id,fecha_hora,total_vehiculos,coches,motos,camiones,buses,velocidad_media_kmh,\
nivel_congestion
1,2024-03-15 08:00:00,100,70,10,15,5,30.0,alta
1,2024-03-15 09:00:00,40,30,5,3,2,50.0,baja
";

const ROTACION: &str = "\
aparcamiento_id,fecha,hora,plazas_ocupadas,plazas_libres,porcentaje_ocupacion
1,2024-03-15,8,50,50,50.0
2,2024-03-15,8,10,90,10.0
";

const APARCAMIENTOS: &str = "\
aparcamiento_id,nombre,direccion,capacidad_total,plazas_movilidad_reducida,\
plazas_vehiculos_electricos,tarifa_hora_euros,horario,latitud,longitud
1,Plaza Mayor,Calle Mayor 1,100,4,6,2.5,24 horas,40.41,-3.70
2,Sol,Puerta del Sol 2,100,2,3,3.0,24 horas,40.42,-3.71
";

const AVISOS: &str = r#"[{"id": 1, "fecha_reporte": "2024-03-15 08:30:00", "tipo": "bache"}]"#;

fn lake_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mobility-lake"))
}

fn write_fixture(root: &Path) -> PathBuf {
    let data = root.join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("bicimad-usos.csv"), BICIMAD).unwrap();
    fs::write(data.join("trafico-horario.csv"), TRAFICO).unwrap();
    fs::write(data.join("parkings-rotacion.csv"), ROTACION).unwrap();
    fs::write(data.join("ext_aparcamientos_info.csv"), APARCAMIENTOS).unwrap();
    fs::write(data.join("avisamadrid.json"), AVISOS).unwrap();
    fs::write(data.join("dump-bbdd-municipal.sql"), "CREATE TABLE avisos (id INT);\n").unwrap();
    let config = format!(
        r#"
[storage]
type = "filesystem"
root = "{root}/lake"

[audit]
sink = "file"
path = "{root}/audit.jsonl"

[sink]
type = "sqlite"
path = "{root}/mobility.db"

[pipeline]
ingest_dir = "{root}/data"
"#,
        root = root.display()
    );
    let path = root.join("mobility-lake.toml");
    fs::write(&path, config).unwrap();
    path
}

fn lake(config: &Path, args: &[&str]) -> Output {
    Command::new(lake_bin())
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("MOBILITY_LAKE_CONFIG")
        .output()
        .expect("run mobility-lake")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "stdout is not json ({err}): {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn run_builds_every_zone_and_loads_the_sink() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixture(dir.path());

    let output = lake(&config, &["run"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let summary = stdout_json(&output);
    assert_eq!(summary["ingest"].as_array().unwrap().len(), 6);
    assert_eq!(summary["process"].as_array().unwrap().len(), 5);
    assert_eq!(summary["access"].as_array().unwrap().len(), 4);
    assert_eq!(summary["policy"]["ok"], true);

    let lake_root = dir.path().join("lake");
    assert!(lake_root.join("process-zone/data/bicimad.parquet").is_file());
    assert!(lake_root.join("access-zone/analytics/rutas_users.parquet").is_file());
    let policy = lake_root.join("govern-zone-security/policies/datalake_security_policy.yaml");
    assert!(policy.is_file());

    let db = rusqlite::Connection::open(dir.path().join("mobility.db")).unwrap();
    let routes: i64 =
        db.query_row("SELECT COUNT(*) FROM rutas_users", [], |row| row.get(0)).unwrap();
    assert_eq!(routes, 2);

    let audit = fs::read_to_string(dir.path().join("audit.jsonl")).unwrap();
    assert!(audit.lines().count() >= 15);
    assert!(audit.contains("\"operation\":\"SINK\""));
}

#[test]
fn govern_queries_read_the_published_records() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixture(dir.path());
    assert!(lake(&config, &["run"]).status.success());

    let untraced = stdout_json(&lake(&config, &["govern", "untraced"]));
    assert_eq!(untraced, Value::Array(Vec::new()));

    let catalog = stdout_json(&lake(&config, &["catalog", "list"]));
    assert_eq!(catalog["datasets"]["access-zone"].as_object().unwrap().len(), 4);

    let trace = stdout_json(&lake(
        &config,
        &[
            "lineage",
            "trace",
            "--bucket",
            "access-zone",
            "--object",
            "analytics/rutas_users.parquet",
        ],
    ));
    assert_eq!(trace["steps"].as_array().unwrap().len(), 2);

    let quality = stdout_json(&lake(&config, &["govern", "quality-report", "--failed-only"]));
    assert_eq!(quality["rows"], Value::Array(Vec::new()));

    let missing = lake(&config, &["catalog", "get", "not_a_dataset"]);
    assert!(!missing.status.success());
}

#[test]
fn process_without_raw_data_reports_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixture(dir.path());
    let output = lake(&config, &["process", "--stage", "bicimad"]);
    assert!(!output.status.success());
    let outcomes = stdout_json(&output);
    assert_eq!(outcomes[0]["name"], "bicimad");
    assert_eq!(outcomes[0]["error_kind"], "not_found");
    assert!(!dir.path().join("lake/process-zone/data/bicimad.parquet").exists());
}

#[test]
fn unknown_stage_names_fail_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixture(dir.path());
    let output = lake(&config, &["process", "--stage", "metro"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown stage `metro`"));
}

#[test]
fn config_validate_reports_success_and_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixture(dir.path());
    let output = lake(&config, &["config", "validate"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "config ok");

    let bad = dir.path().join("bad.toml");
    fs::write(&bad, "[quality]\nmode = \"sometimes\"\n").unwrap();
    let output = lake(&bad, &["config", "validate"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("config load failed"));
}

#[test]
fn example_config_is_printed() {
    let dir = tempfile::tempdir().unwrap();
    let output = lake(&dir.path().join("unused.toml"), &["config", "example"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("[storage]"));
}
