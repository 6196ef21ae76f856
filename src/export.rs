//! Spreadsheet export of the commission listing.
//!
//! The file targets pt-BR spreadsheet software: UTF-8 with a BOM, `;` as
//! the delimiter, every field quoted and amounts with a decimal comma.

use chrono::NaiveDate;
use csv::{QuoteStyle, WriterBuilder};
use thiserror::Error;

use crate::format::{fix_name_spacing, format_date, format_decimal, yes_no, PLACEHOLDER};
use crate::models::Commission;

const BOM: &str = "\u{feff}";

const HEADERS: [&str; 13] = [
    "ID",
    "Corretor",
    "Empreendimento",
    "Unidade",
    "Cliente",
    "Contrato",
    "Valor Comissão",
    "Valor Pago",
    "Valor Gatilho",
    "Atingiu Gatilho",
    "Status Parcela",
    "Status Aprovação",
    "Data Comissão",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Nenhuma comissão para exportar")]
    Empty,
    #[error("failed to write csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush csv buffer: {0}")]
    Io(#[from] std::io::Error),
}

pub fn commissions_csv(rows: &[Commission]) -> Result<Vec<u8>, ExportError> {
    if rows.is_empty() {
        return Err(ExportError::Empty);
    }

    let mut writer = WriterBuilder::new()
        .delimiter(b';')
        .quote_style(QuoteStyle::Always)
        .from_writer(BOM.as_bytes().to_vec());

    writer.write_record(HEADERS)?;
    for row in rows {
        writer.write_record(record(row))?;
    }

    writer.into_inner().map_err(|err| ExportError::Io(err.into_error()))
}

pub fn export_filename(day: NaiveDate) -> String {
    format!("comissoes_{}.csv", day.format("%Y-%m-%d"))
}

fn record(row: &Commission) -> [String; 13] {
    [
        row.id.to_string(),
        fix_name_spacing(row.broker_nome.as_deref()),
        text(row.enterprise_name.as_deref()),
        text(row.unit_name.as_deref()),
        text(row.customer_name.as_deref()),
        text(row.numero_contrato.as_deref()),
        format_decimal(row.commission_value),
        format_decimal(row.valor_pago),
        format_decimal(row.valor_gatilho),
        yes_no(row.atingiu_gatilho).to_string(),
        row.installment_status().label().into_owned(),
        row.approval_status().label().to_string(),
        date(row.commission_date.as_deref()),
    ]
}

fn text(value: Option<&str>) -> String {
    value.unwrap_or_default().trim().to_string()
}

fn date(raw: Option<&str>) -> String {
    match format_date(raw) {
        placeholder if placeholder == PLACEHOLDER => String::new(),
        formatted => formatted,
    }
}
