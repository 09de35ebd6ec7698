//! CSV files of the pipeline
//!
//! Three tabular formats flow between stages:
//!
//! - dataset / split files: `url,label`
//! - feature tables: `url,label,<schema columns...>`
//!
//! Fields containing commas, quotes or newlines are quoted with doubled inner
//! quotes, so any URL survives a write/read round trip.

use crate::error::{DetectorError, Result};
use crate::features::{extract, FeatureVector};
use crate::schema::FeatureSchema;
use crate::synth::{Label, UrlRecord};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs;
use std::path::Path;

const RECORD_HEADER: [&str; 2] = ["url", "label"];

/// Escape CSV field (handle commas, quotes, newlines)
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
    {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split CSV text into rows of fields, honoring quoted fields
fn parse_csv(text: &str) -> std::result::Result<Vec<Vec<String>>, String> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    // Blank lines carry no record
    rows.retain(|r| !(r.len() == 1 && r[0].is_empty()));
    Ok(rows)
}

fn read_table(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let text = fs::read_to_string(path)
        .map_err(|e| DetectorError::dataset_read(path, e.to_string()))?;
    let mut rows = parse_csv(&text).map_err(|e| DetectorError::dataset_read(path, e))?;
    if rows.is_empty() {
        return Err(DetectorError::dataset_read(path, "file is empty"));
    }
    let header = rows.remove(0).into_iter().map(|h| h.trim().to_string()).collect();
    Ok((header, rows))
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, text)?;
    Ok(())
}

fn parse_label(raw: &str) -> std::result::Result<Label, String> {
    let value: u8 = raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid label '{}'", raw))?;
    Label::try_from(value)
}

/// Serialize records as `url,label` CSV
pub fn records_to_csv(records: &[UrlRecord]) -> String {
    let mut output = RECORD_HEADER.join(",");
    output.push('\n');
    for record in records {
        output.push_str(&escape_field(&record.url));
        output.push(',');
        output.push_str(&record.label.to_string());
        output.push('\n');
    }
    output
}

/// Write records to a `url,label` CSV file, creating parent directories
pub fn write_records(path: impl AsRef<Path>, records: &[UrlRecord]) -> Result<()> {
    let path = path.as_ref();
    write_text(path, &records_to_csv(records))?;
    tracing::info!(path = %path.display(), rows = records.len(), "wrote dataset");
    Ok(())
}

/// Read a `url,label` CSV file
///
/// Extra columns are ignored, so a feature table can be read back as records.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<UrlRecord>> {
    let path = path.as_ref();
    let (header, rows) = read_table(path)?;
    let url_idx = column_index(&header, "url")
        .ok_or_else(|| DetectorError::dataset_read(path, "missing 'url' column"))?;
    let label_idx = column_index(&header, "label")
        .ok_or_else(|| DetectorError::dataset_read(path, "missing 'label' column"))?;

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let line = i + 2;
            let url = row.get(url_idx).ok_or_else(|| {
                DetectorError::dataset_read(path, format!("line {}: missing url", line))
            })?;
            let label = row
                .get(label_idx)
                .ok_or_else(|| "missing label".to_string())
                .and_then(|raw| parse_label(raw))
                .map_err(|e| DetectorError::dataset_read(path, format!("line {}: {}", line, e)))?;
            Ok(UrlRecord::new(url.clone(), label))
        })
        .collect()
}

fn column_index(header: &[String], name: &str) -> Option<usize> {
    header.iter().position(|h| h == name)
}

/// Shuffle and split items into `(train, test)`
///
/// The test partition gets `ceil(len * test_fraction)` items.
pub fn train_test_split<T: Clone>(items: &[T], test_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let fraction = if test_fraction.is_finite() {
        test_fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mut indices: Vec<usize> = (0..items.len()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    // Tolerance keeps 600 * 0.2 at 120 rather than rounding noise up to 121.
    let raw = items.len() as f64 * fraction;
    let test_len = ((raw - 1e-9).ceil().max(0.0) as usize).min(items.len());
    let (test_idx, train_idx) = indices.split_at(test_len);
    let train = train_idx.iter().map(|&i| items[i].clone()).collect();
    let test = test_idx.iter().map(|&i| items[i].clone()).collect();
    (train, test)
}

/// Split a dataset file into train and test files
///
/// Returns the number of rows written to each.
pub fn preprocess(
    input: impl AsRef<Path>,
    train_output: impl AsRef<Path>,
    test_output: impl AsRef<Path>,
    test_fraction: f64,
    seed: u64,
) -> Result<(usize, usize)> {
    let records = read_records(input.as_ref())?;
    tracing::info!(rows = records.len(), "loaded samples");

    let (train, test) = train_test_split(&records, test_fraction, seed);
    write_records(train_output, &train)?;
    write_records(test_output, &test)?;
    Ok((train.len(), test.len()))
}

/// One row of a feature table
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTableRow {
    pub url: String,
    pub label: Label,
    /// Values in the order of [`FeatureTable::columns`]
    pub values: Vec<f64>,
}

/// Feature table as read from disk
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    /// Feature column names, in file order
    pub columns: Vec<String>,
    pub rows: Vec<FeatureTableRow>,
}

impl FeatureTable {
    /// Extract features for every record using `schema`'s columns
    pub fn from_records(records: &[UrlRecord], schema: &FeatureSchema) -> Self {
        let columns: Vec<String> = schema.fields.iter().map(|f| f.name.clone()).collect();
        let rows = records
            .iter()
            .map(|record| {
                let features = extract(&record.url);
                FeatureTableRow {
                    url: record.url.clone(),
                    label: record.label,
                    values: feature_values(&features, &columns),
                }
            })
            .collect();
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Feature rows in `schema` order together with class labels
    ///
    /// Fails with [`DetectorError::FeatureSchemaMismatch`] when a schema
    /// column is missing from the table.
    pub fn select(&self, schema: &FeatureSchema) -> Result<(Vec<Vec<f32>>, Vec<usize>)> {
        let indices = schema
            .fields
            .iter()
            .map(|field| column_index(&self.columns, &field.name))
            .collect::<Option<Vec<usize>>>()
            .ok_or_else(|| DetectorError::FeatureSchemaMismatch {
                expected: schema.to_string(),
                found: format!(
                    "feature table with {} columns: {}",
                    self.columns.len(),
                    self.columns.join(",")
                ),
            })?;

        let features = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row.values[i] as f32).collect())
            .collect();
        let labels = self.rows.iter().map(|row| row.label.as_class()).collect();
        Ok((features, labels))
    }

    pub fn to_csv(&self) -> String {
        let mut output = RECORD_HEADER.join(",");
        for column in &self.columns {
            output.push(',');
            output.push_str(column);
        }
        output.push('\n');

        for row in &self.rows {
            output.push_str(&escape_field(&row.url));
            output.push(',');
            output.push_str(&row.label.to_string());
            for value in &row.values {
                output.push(',');
                output.push_str(&value.to_string());
            }
            output.push('\n');
        }
        output
    }
}

fn feature_values(features: &FeatureVector, columns: &[String]) -> Vec<f64> {
    columns
        .iter()
        .map(|c| features.value(c).unwrap_or(0.0))
        .collect()
}

/// Read records from `input`, extract features, and write the feature table
pub fn extract_to_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    schema: &FeatureSchema,
) -> Result<FeatureTable> {
    let records = read_records(input)?;
    let table = FeatureTable::from_records(&records, schema);
    write_feature_table(output, &table)?;
    Ok(table)
}

pub fn write_feature_table(path: impl AsRef<Path>, table: &FeatureTable) -> Result<()> {
    let path = path.as_ref();
    write_text(path, &table.to_csv())?;
    tracing::info!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns.len(),
        "saved features"
    );
    Ok(())
}

/// Read a feature table written by [`write_feature_table`]
pub fn read_feature_table(path: impl AsRef<Path>) -> Result<FeatureTable> {
    let path = path.as_ref();
    let (header, rows) = read_table(path)?;
    if header.len() < 2 || header[0] != "url" || header[1] != "label" {
        return Err(DetectorError::dataset_read(
            path,
            format!("expected header to start with url,label, got {}", header.join(",")),
        ));
    }
    let columns: Vec<String> = header[2..].to_vec();

    let rows = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let line = i + 2;
            if row.len() != header.len() {
                return Err(DetectorError::dataset_read(
                    path,
                    format!(
                        "line {}: expected {} fields, got {}",
                        line,
                        header.len(),
                        row.len()
                    ),
                ));
            }
            let label = parse_label(&row[1])
                .map_err(|e| DetectorError::dataset_read(path, format!("line {}: {}", line, e)))?;
            let values = row[2..]
                .iter()
                .map(|raw| raw.trim().parse::<f64>())
                .collect::<std::result::Result<Vec<f64>, _>>()
                .map_err(|e| {
                    DetectorError::dataset_read(path, format!("line {}: {}", line, e))
                })?;
            Ok(FeatureTableRow {
                url: row[0].clone(),
                label,
                values,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(FeatureTable { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("http://a.com"), "http://a.com");
        assert_eq!(escape_field("http://a.com/?x=1,2"), "\"http://a.com/?x=1,2\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_parse_csv_quotes_and_blank_lines() {
        let rows = parse_csv("url,label\n\"a,b\",1\n\n\"q\"\"x\",0\r\n").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["a,b".to_string(), "1".to_string()]);
        assert_eq!(rows[2], vec!["q\"x".to_string(), "0".to_string()]);
    }

    #[test]
    fn test_parse_csv_unterminated_quote() {
        assert!(parse_csv("url,label\n\"oops,1\n").is_err());
    }

    #[test]
    fn test_records_roundtrip_with_awkward_urls() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/data.csv");
        let records = vec![
            UrlRecord::new("https://google.com/search?q=a,b", Label::Legitimate),
            UrlRecord::new("http://x.io/\"quoted\"", Label::Phishing),
            UrlRecord::new("", Label::Legitimate),
        ];

        write_records(&path, &records).unwrap();
        let loaded = read_records(&path).unwrap();
        // The empty URL row serializes as ",0" which still parses as two fields
        assert_eq!(loaded, records);
    }

    #[test]
    fn test_read_records_missing_file() {
        let err = read_records("/nonexistent/phishguard/data.csv").unwrap_err();
        assert!(matches!(err, DetectorError::DatasetRead { .. }));
    }

    #[test]
    fn test_read_records_bad_label() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "url,label\nhttp://a.com,7\n").unwrap();
        let err = read_records(&path).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_read_records_missing_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "address,class\nhttp://a.com,1\n").unwrap();
        assert!(matches!(
            read_records(&path),
            Err(DetectorError::DatasetRead { .. })
        ));
    }

    #[test]
    fn test_train_test_split_sizes_and_determinism() {
        let items: Vec<usize> = (0..101).collect();
        let (train, test) = train_test_split(&items, 0.2, 42);
        assert_eq!(test.len(), 21);
        assert_eq!(train.len(), 80);

        let (train2, test2) = train_test_split(&items, 0.2, 42);
        assert_eq!(train, train2);
        assert_eq!(test, test2);

        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort_unstable();
        assert_eq!(all, items);
    }

    #[test]
    fn test_feature_table_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("features.csv");
        let records = vec![
            UrlRecord::new("https://www.wikipedia.org/about", Label::Legitimate),
            UrlRecord::new("http://192.168.1.5/login.php", Label::Phishing),
        ];
        let table = FeatureTable::from_records(&records, &FeatureSchema::lexical_entropy_v2());

        write_feature_table(&path, &table).unwrap();
        let header = fs::read_to_string(&path).unwrap();
        assert!(header.starts_with(
            "url,label,url_length,dot_count,https,suspicious_words,host_entropy\n"
        ));

        let loaded = read_feature_table(&path).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_select_reports_missing_columns() {
        let records = vec![UrlRecord::new("http://a.com", Label::Legitimate)];
        let table = FeatureTable::from_records(&records, &FeatureSchema::lexical_v1());

        assert!(table.select(&FeatureSchema::lexical_v1()).is_ok());
        let err = table
            .select(&FeatureSchema::lexical_entropy_v2())
            .unwrap_err();
        assert!(matches!(err, DetectorError::FeatureSchemaMismatch { .. }));
    }

    #[test]
    fn test_select_v1_from_v2_table() {
        let records = vec![UrlRecord::new("https://a.b.c/login", Label::Phishing)];
        let table = FeatureTable::from_records(&records, &FeatureSchema::lexical_entropy_v2());
        let (features, labels) = table.select(&FeatureSchema::lexical_v1()).unwrap();
        assert_eq!(features[0], vec![19.0, 2.0, 1.0, 1.0]);
        assert_eq!(labels, vec![1]);
    }
}
