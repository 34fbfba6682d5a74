// Survey responses exported as Excel workbooks.

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::pipeline::io_common::parse_response;
use crate::pipeline::*;

pub fn read_excel_responses(
    path: &str,
    columns: &ResponseColumns,
    worksheet_name: Option<&str>,
) -> PipelineResult<Vec<Response>> {
    let wrange = get_range(path, worksheet_name)?;

    let mut iter = wrange.rows();
    let header: Vec<String> = match iter.next() {
        Some(row) => row
            .iter()
            .enumerate()
            .map(|(idx, cell)| cell_text(cell, 1, idx))
            .collect::<PipelineResult<Vec<String>>>()?,
        None => return EmptyExcelSnafu { path }.fail(),
    };
    debug!("read_excel_responses: header: {:?}", header);

    let find = |name: &str| header.iter().position(|h| h.trim() == name);
    let mut missing: Vec<String> = Vec::new();
    let mut indexes: Vec<usize> = Vec::new();
    for name in [&columns.state, &columns.preference, &columns.likely] {
        match find(name) {
            Some(idx) => indexes.push(idx),
            None => missing.push(name.clone()),
        }
    }
    ensure!(missing.is_empty(), SchemaSnafu { path, missing });

    let mut res: Vec<Response> = Vec::new();
    for (idx, row) in iter.enumerate() {
        // The header is on the first line.
        let lineno = idx + 2;
        let mut cells: Vec<String> = Vec::with_capacity(3);
        for col in indexes.iter() {
            let text = match row.get(*col) {
                Some(cell) => cell_text(cell, lineno, *col)?,
                None => String::new(),
            };
            cells.push(text);
        }
        let r = parse_response(path, lineno, columns, &cells[0], &cells[1], &cells[2])?;
        res.push(r);
    }
    debug!("read_excel_responses: {} rows", res.len());
    Ok(res)
}

fn cell_text(cell: &DataType, lineno: usize, col: usize) -> PipelineResult<String> {
    match cell {
        DataType::String(s) => Ok(s.clone()),
        DataType::Float(f) => Ok(f.to_string()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Bool(b) => Ok(b.to_string()),
        DataType::Empty => Ok(String::new()),
        _ => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("column {}: {:?}", col + 1, cell),
        }
        .fail(),
    }
}

fn get_range(path: &str, worksheet_name: Option<&str>) -> PipelineResult<Range<DataType>> {
    debug!(
        "read_excel_responses: path: {:?} worksheet: {:?}",
        path, worksheet_name
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it. Otherwise take the first one.
    let wrange = match worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { path, name })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?,
    };
    wrange.context(OpeningExcelSnafu { path })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKBOOK: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/responses.xlsx");

    #[test]
    fn responses_from_workbook() {
        let columns = ResponseColumns::default();
        let first = read_excel_responses(WORKBOOK, &columns, None).unwrap();
        let named = read_excel_responses(WORKBOOK, &columns, Some("Responses")).unwrap();
        assert_eq!(first, named);
        assert_eq!(
            first,
            vec![
                Response {
                    state_fips: 55,
                    preference: Some(PreferenceCode::Trump),
                    likely_voter: true,
                },
                Response {
                    state_fips: 55,
                    preference: Some(PreferenceCode::NotSure),
                    likely_voter: false,
                },
                Response {
                    state_fips: 6,
                    preference: None,
                    likely_voter: true,
                },
                Response {
                    state_fips: 6,
                    preference: Some(PreferenceCode::Harris),
                    likely_voter: true,
                },
            ]
        );
    }

    #[test]
    fn workbook_errors() {
        let columns = ResponseColumns {
            likely: "likely_voter".to_string(),
            ..ResponseColumns::default()
        };
        assert!(matches!(
            read_excel_responses(WORKBOOK, &columns, None),
            Err(PipelineError::Schema { missing, .. }) if missing == vec!["likely_voter"]
        ));
        assert!(matches!(
            read_excel_responses(WORKBOOK, &ResponseColumns::default(), Some("Sheet9")),
            Err(PipelineError::MissingWorksheet { .. })
        ));
        assert!(matches!(
            read_excel_responses("no_such_file.xlsx", &ResponseColumns::default(), None),
            Err(PipelineError::OpeningExcel { .. })
        ));
    }
}
