use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

use super::error::EdxError;

pub const ELEMENT_COLUMN: &str = "Element";
pub const ENERGY_COLUMN: &str = "Theory (eV)";

/// Elements typically found in biological substrates.
pub const BIOLOGICAL_ELEMENTS: [&str; 21] = [
    "Na", "Mg", "Al", "Si", "P", "S", "Cl", "K", "Ca", "Ti", "Cr", "Mn", "Fe", "Ni", "Cu", "Zn",
    "Se", "Mo", "Ag", "Sn", "Pb",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ElementSelection {
    #[default]
    All,
    Elements(Vec<String>),
    Biological,
}

/// Characteristic emission lines (eV) per element symbol.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReferenceTable {
    lines: BTreeMap<String, Vec<f64>>,
}

impl ReferenceTable {
    /// Builds a table from `(element, energy_ev)` pairs. Non-finite energies
    /// are dropped, so every element present has at least one line.
    pub fn from_entries<S, I>(entries: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, f64)>,
    {
        let mut lines: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for (element, energy_ev) in entries {
            if !energy_ev.is_finite() {
                continue;
            }
            let element: String = element.into();
            let element = element.trim();
            if element.is_empty() {
                continue;
            }
            lines.entry(element.to_owned()).or_default().push(energy_ev);
        }
        ReferenceTable { lines }
    }

    pub fn from_csv(path: &Path) -> Result<Self, EdxError> {
        let df = read_reference_frame(path).map_err(|e| EdxError::reference(path, e.to_string()))?;

        for column in [ELEMENT_COLUMN, ENERGY_COLUMN] {
            if df.column(column).is_err() {
                return Err(EdxError::reference(
                    path,
                    format!("missing required column '{}'", column),
                ));
            }
        }

        let entries = reference_entries(&df).map_err(|e| EdxError::reference(path, e.to_string()))?;
        let table = Self::from_entries(entries);
        if table.is_empty() {
            return Err(EdxError::reference(path, "no rows with a numeric energy"));
        }

        log::info!(
            "Loaded {} reference lines for {} elements from {}",
            table.line_count(),
            table.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn elements(&self) -> impl Iterator<Item = &str> {
        self.lines.keys().map(String::as_str)
    }

    pub fn lines(&self, element: &str) -> Option<&[f64]> {
        self.lines.get(element).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.lines
            .iter()
            .map(|(element, lines)| (element.as_str(), lines.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.values().map(Vec::len).sum()
    }

    /// Returns a copy holding only the selected elements.
    pub fn restrict(&self, selection: &ElementSelection) -> Self {
        let wanted: Vec<&str> = match selection {
            ElementSelection::All => return self.clone(),
            ElementSelection::Elements(elements) => elements.iter().map(String::as_str).collect(),
            ElementSelection::Biological => BIOLOGICAL_ELEMENTS.to_vec(),
        };

        if let ElementSelection::Elements(_) = selection {
            for element in &wanted {
                if !self.lines.contains_key(*element) {
                    log::warn!("Selected element {} is not in the reference table", element);
                }
            }
        }

        let lines = self
            .lines
            .iter()
            .filter(|(element, _)| wanted.contains(&element.as_str()))
            .map(|(element, lines)| (element.clone(), lines.clone()))
            .collect();
        ReferenceTable { lines }
    }
}

fn read_reference_frame(path: &Path) -> PolarsResult<DataFrame> {
    // Read every column as text; energies are coerced below so that stray
    // labels in the energy column become nulls instead of a parse failure.
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
}

fn reference_entries(df: &DataFrame) -> PolarsResult<Vec<(String, f64)>> {
    let elements = df.column(ELEMENT_COLUMN)?.cast(&DataType::String)?;
    let energies = df.column(ENERGY_COLUMN)?.cast(&DataType::Float64)?;

    Ok(elements
        .str()?
        .into_iter()
        .zip(energies.f64()?.into_iter())
        .filter_map(|(element, energy)| match (element, energy) {
            (Some(element), Some(energy)) => Some((element.to_owned(), energy)),
            _ => None,
        })
        .collect())
}
