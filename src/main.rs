//! # Avalia CLI
//!
//! Usage:
//!   avalia report evaluation.json [-o DIR] [--legacy-csv]
//!   avalia overview collection.json [-o DIR]
//!   avalia --example > evaluation.json

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use avalia::aggregate::aggregate_by_school;
use avalia::criteria;
use avalia::error::ReportError;
use avalia::export::{flat, workbook};
use avalia::model::EvaluationForm;
use avalia::store::{EvaluationStore, JsonCollection, LocalPhotoSource};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_evaluation_json());
        return;
    }

    let out_dir: PathBuf = args
        .windows(2)
        .find(|w| w[0] == "-o")
        .map(|w| PathBuf::from(&w[1]))
        .unwrap_or_else(|| PathBuf::from("."));

    let result = match (args.get(1).map(String::as_str), args.get(2)) {
        (Some("report"), Some(input)) => {
            let legacy = args.iter().any(|a| a == "--legacy-csv");
            run_report(Path::new(input), &out_dir, legacy)
        }
        (Some("overview"), Some(input)) => run_overview(Path::new(input), &out_dir),
        _ => {
            eprintln!("Usage:");
            eprintln!("  avalia report evaluation.json [-o DIR] [--legacy-csv]");
            eprintln!("  avalia overview collection.json [-o DIR]");
            eprintln!("  avalia --example > evaluation.json");
            process::exit(2);
        }
    };

    if let Err(e) = result {
        error!("✗ {e}");
        process::exit(1);
    }
}

/// Submission path: validate, assemble (normalizing photos), render the
/// PDF report and write the CSV export next to it.
fn run_report(input: &Path, out_dir: &Path, legacy_csv: bool) -> Result<(), ReportError> {
    let raw = fs::read_to_string(input).map_err(|e| ReportError::Read {
        path: input.display().to_string(),
        source: e,
    })?;
    let form: EvaluationForm = serde_json::from_str(&raw)?;
    let evaluation = form.assemble(&LocalPhotoSource)?;

    let pdf_bytes = avalia::render_report(&evaluation);
    let pdf_name = flat::export_file_name(&evaluation.school, evaluation.timestamp_millis, "pdf");
    write_file(out_dir, &pdf_name, &pdf_bytes)?;

    let csv = if legacy_csv {
        flat::legacy_csv(&evaluation)
    } else {
        flat::full_csv(&evaluation)
    };
    let csv_name = flat::export_file_name(&evaluation.school, evaluation.timestamp_millis, "csv");
    write_file(out_dir, &csv_name, csv.as_bytes())?;

    info!("✓ relatório gerado com sucesso");
    Ok(())
}

/// Aggregation path: load the stored collection, print per-school
/// averages, render the overview PDF and write the workbook. A store read
/// failure aborts before any export is attempted.
fn run_overview(input: &Path, out_dir: &Path) -> Result<(), ReportError> {
    let store = JsonCollection::new(input);
    let records = store.fetch_all()?;

    if records.is_empty() {
        info!("nenhuma avaliação registrada ainda");
        return Ok(());
    }

    for (school, bucket) in aggregate_by_school(&records) {
        println!("{school} ({} avaliações)", bucket.count);
        let averages = bucket.averages();
        for id in criteria::ordered_ids(&averages) {
            println!("  {}: {:.2}", criteria::short_label(id), averages[id]);
        }
    }

    let pdf_bytes = avalia::render_overview(&records, &LocalPhotoSource);
    write_file(out_dir, avalia::OVERVIEW_PDF_FILE_NAME, &pdf_bytes)?;

    let rows = workbook::overview_rows(&records);
    let workbook_bytes = workbook::write_workbook(&rows)?;
    write_file(out_dir, workbook::WORKBOOK_FILE_NAME, &workbook_bytes)?;

    Ok(())
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<(), ReportError> {
    fs::create_dir_all(dir).map_err(|e| ReportError::Write {
        path: dir.display().to_string(),
        source: e,
    })?;
    let path = dir.join(name);
    fs::write(&path, bytes).map_err(|e| ReportError::Write {
        path: path.display().to_string(),
        source: e,
    })?;
    info!("✓ written {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

fn example_evaluation_json() -> &'static str {
    r##"{
  "userName": "Maria Souza",
  "userEmail": "maria@example.com",
  "school": "Colégio São João",
  "scores": {
    "professores": 8,
    "alunos": 7,
    "metodo": 8,
    "estrutura": 6,
    "limpeza": 9,
    "convivencia": 7,
    "esportes": 5,
    "atividades": 6,
    "distancia": 8,
    "seguranca": 7,
    "custos": 5,
    "bolsas": 4,
    "materiais": 6,
    "cantina": 7,
    "reputacao": 9
  },
  "comments": {
    "professores": "Equipe experiente, boa comunicação com os pais.",
    "esportes": "A quadra precisa de reforma.",
    "custos": "Mensalidade acima da média do bairro."
  },
  "photos": {
    "estrutura": ["./fotos/fachada.jpg", "./fotos/patio.jpg"]
  },
  "observacoes": "Visita feita durante o período da manhã."
}
"##
}
