use std::fs::{self, File};
use std::path::Path;

use polars::prelude::*;
use tracing::{info, warn};

use crate::error::{CatalogError, Result};
use crate::models::{Dataset, Record};
use crate::pricing::{is_rounded, round_price};

/// On-disk layout, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Parquet,
    Json,
}

impl DatasetFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => Some(Self::Parquet),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Some(Self::Json),
            _ => None,
        }
    }
}

/// Saves and loads datasets as columnar files with the columns
/// `id, title, price, discount_percentage, final_price`.
pub struct DatasetStore;

impl DatasetStore {
    pub fn save(&self, dataset: &Dataset, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let save_err = |reason: String| CatalogError::DatasetSave {
            path: path.display().to_string(),
            reason,
        };

        let format = DatasetFormat::from_path(path)
            .ok_or_else(|| save_err("unsupported file extension".to_string()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| save_err(e.to_string()))?;
            }
        }

        let mut df = self.to_dataframe(dataset).map_err(|e| save_err(e.to_string()))?;
        let mut file = File::create(path).map_err(|e| save_err(e.to_string()))?;

        let written = match format {
            DatasetFormat::Parquet => ParquetWriter::new(&mut file).finish(&mut df).map(|_| ()),
            DatasetFormat::Json => JsonWriter::new(&mut file)
                .with_json_format(JsonFormat::Json)
                .finish(&mut df),
        };
        written.map_err(|e| save_err(e.to_string()))?;

        info!("Wrote {} products to {}", dataset.len(), path.display());
        Ok(())
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let path = path.as_ref();
        let load_err = |reason: String| CatalogError::DatasetLoad {
            path: path.display().to_string(),
            reason,
        };

        let format = DatasetFormat::from_path(path)
            .ok_or_else(|| load_err("unsupported file extension".to_string()))?;

        let file = File::open(path).map_err(|e| load_err(e.to_string()))?;

        let df = match format {
            DatasetFormat::Parquet => ParquetReader::new(file).finish(),
            DatasetFormat::Json => JsonReader::new(file).finish(),
        }
        .map_err(|e| load_err(e.to_string()))?;

        let dataset = self.from_dataframe(&df).map_err(load_err)?;
        info!("Loaded {} products from {}", dataset.len(), path.display());

        Ok(dataset)
    }

    pub fn to_dataframe(&self, dataset: &Dataset) -> PolarsResult<DataFrame> {
        let records = dataset.records();

        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        let prices: Vec<f64> = records.iter().map(|r| r.price).collect();
        let discounts: Vec<f64> = records.iter().map(|r| r.discount_percentage).collect();
        let final_prices: Vec<f64> = records.iter().map(|r| r.final_price).collect();

        DataFrame::new(vec![
            Series::new("id".into(), ids).into(),
            Series::new("title".into(), titles).into(),
            Series::new("price".into(), prices).into(),
            Series::new("discount_percentage".into(), discounts).into(),
            Series::new("final_price".into(), final_prices).into(),
        ])
    }

    /// Build a dataset from a frame. `id` and `final_price` are required; the stored final
    /// price is trusted but snapped to 2 decimals.
    pub fn from_dataframe(&self, df: &DataFrame) -> std::result::Result<Dataset, String> {
        let height = df.height();

        let ids = cast_column(df, &["id"], DataType::Int64)?
            .ok_or_else(|| "missing required column 'id'".to_string())?;
        let final_prices = cast_column(df, &["final_price"], DataType::Float64)?
            .ok_or_else(|| "missing required column 'final_price'".to_string())?;
        let titles = cast_column(df, &["title"], DataType::String)?;
        let prices = cast_column(df, &["price"], DataType::Float64)?;
        let discounts = cast_column(
            df,
            &["discount_percentage", "discountPercentage"],
            DataType::Float64,
        )?;

        let ids = ids.i64().map_err(|e| e.to_string())?;
        let final_prices = final_prices.f64().map_err(|e| e.to_string())?;
        let titles = titles.as_ref().map(|c| c.str()).transpose().map_err(|e| e.to_string())?;
        let prices = prices.as_ref().map(|c| c.f64()).transpose().map_err(|e| e.to_string())?;
        let discounts = discounts
            .as_ref()
            .map(|c| c.f64())
            .transpose()
            .map_err(|e| e.to_string())?;

        let mut records = Vec::with_capacity(height);
        let mut unrounded = 0;
        let mut null_prices = 0;

        for row in 0..height {
            let id = ids.get(row).ok_or_else(|| format!("null id at row {}", row))?;

            let final_price = match final_prices.get(row) {
                Some(v) => {
                    if !is_rounded(v) {
                        unrounded += 1;
                    }
                    round_price(v)
                }
                None => {
                    null_prices += 1;
                    f64::NAN
                }
            };

            records.push(Record {
                id,
                title: titles
                    .and_then(|t| t.get(row))
                    .unwrap_or_default()
                    .to_string(),
                price: prices.and_then(|p| p.get(row)).unwrap_or(f64::NAN),
                discount_percentage: discounts.and_then(|d| d.get(row)).unwrap_or(f64::NAN),
                final_price,
            });
        }

        if unrounded > 0 {
            warn!("{} stored final prices had more than 2 decimals and were rounded", unrounded);
        }
        if null_prices > 0 {
            warn!("{} rows have no final price and will never match", null_prices);
        }

        Ok(Dataset::new(records))
    }
}

// First present column among `names`, cast to `dtype`.
fn cast_column(
    df: &DataFrame,
    names: &[&str],
    dtype: DataType,
) -> std::result::Result<Option<Column>, String> {
    for name in names {
        if let Ok(column) = df.column(name) {
            return column
                .cast(&dtype)
                .map(Some)
                .map_err(|e| format!("column '{}': {}", name, e));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(vec![
            Record::priced(1, "Essence Mascara Lash Princess", 9.99, 7.17).unwrap(),
            Record::priced(2, "Eyeshadow Palette with Mirror", 19.99, 5.5).unwrap(),
            Record::priced(3, "Powder Canister", 14.99, 18.14).unwrap(),
        ])
    }

    #[test]
    fn test_parquet_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw").join("products.parquet");
        let store = DatasetStore;

        let original = sample();
        store.save(&original, &path).unwrap();
        assert!(path.exists());

        let loaded = store.load(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");
        let store = DatasetStore;

        let original = sample();
        store.save(&original, &path).unwrap();
        let loaded = store.load(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_baseline_final_price_rounded_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("expected.parquet");

        let mut df = df!(
            "id" => [1i32, 2, 3],
            "title" => ["a", "b", "c"],
            "discountPercentage" => [0.0, 10.0, 12.5],
            "final_price" => [Some(12.345), Some(90.0), None]
        )
        .unwrap();
        let mut file = File::create(&path).unwrap();
        ParquetWriter::new(&mut file).finish(&mut df).unwrap();

        let loaded = DatasetStore.load(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.get(1).unwrap().final_price, 12.35);
        assert_eq!(loaded.get(2).unwrap().discount_percentage, 10.0);
        assert!(loaded.get(2).unwrap().price.is_nan());
        assert!(loaded.get(3).unwrap().final_price.is_nan());
    }

    #[test]
    fn test_missing_required_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("expected.parquet");

        let mut df = df!("id" => [1i64, 2], "title" => ["a", "b"]).unwrap();
        let mut file = File::create(&path).unwrap();
        ParquetWriter::new(&mut file).finish(&mut df).unwrap();

        match DatasetStore.load(&path) {
            Err(CatalogError::DatasetLoad { reason, .. }) => {
                assert!(reason.contains("final_price"), "{}", reason)
            }
            other => panic!("expected load error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = DatasetStore.load("does/not/exist.parquet").unwrap_err();
        assert!(matches!(err, CatalogError::DatasetLoad { .. }));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = DatasetStore.save(&sample(), dir.path().join("data.xlsx")).unwrap_err();
        assert!(matches!(err, CatalogError::DatasetSave { .. }));
    }
}
