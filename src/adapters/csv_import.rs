use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use crate::domain::model::{Color, NewAnimal};
use crate::utils::error::{FarmError, Result};
use crate::utils::validation::validate_non_empty_string;

#[derive(Debug, Deserialize)]
struct AnimalRow {
    name: String,
    favorite_color: String,
}

/// Reads animals from a CSV file with a `name,favorite_color` header.
pub fn read_animals<P: AsRef<Path>>(path: P) -> Result<Vec<NewAnimal>> {
    let file = std::fs::File::open(path)?;
    parse_animals(file)
}

pub fn parse_animals<R: Read>(reader: R) -> Result<Vec<NewAnimal>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut animals = Vec::new();
    for (line, row) in csv_reader.deserialize::<AnimalRow>().enumerate() {
        let row = row?;
        validate_non_empty_string("name", &row.name)?;
        let color: Color = row.favorite_color.parse().map_err(|_| FarmError::ValidationError {
            message: format!(
                "Row {}: unknown favorite_color '{}'",
                line + 1,
                row.favorite_color
            ),
        })?;
        animals.push(NewAnimal::new(row.name, color));
    }

    tracing::debug!("Parsed {} animals from CSV", animals.len());
    Ok(animals)
}
