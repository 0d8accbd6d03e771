//! Binding result-set rows onto record values by column name.

use std::collections::HashMap;

use crate::core::model::Model;
use crate::core::schema::Schema;
use crate::core::traits::ResultSet;
use crate::core::value::Value;
use crate::error::Result;

/// Bind every row of a result set onto fresh records, appending to `dest`.
///
/// The column-to-member map is built once from the schema (the single
/// source of truth for naming) and reused across all rows. Columns with no
/// matching member are discarded, which keeps reads forward-compatible with
/// extra columns; members with no matching column keep their `Default`
/// value.
///
/// The set is consumed until exhaustion or the first error. On error the
/// rows bound so far remain in `dest` and the error is returned; callers
/// see a non-ok result alongside a partially filled list.
pub(crate) async fn bind_rows<T: Model>(
    schema: &Schema,
    mut rs: ResultSet,
    dest: &mut Vec<T>,
) -> Result<()> {
    let col_to_field: HashMap<&str, &'static str> = schema
        .fields
        .iter()
        .map(|f| (f.column.as_str(), f.name))
        .collect();

    while let Some(item) = rs.next().await {
        let row = item?;
        let mut record = T::default();
        let mut values = row.values;

        for (i, column) in row.columns.iter().enumerate() {
            let Some(field) = col_to_field.get(column.as_str()) else {
                continue;
            };
            if i < values.len() {
                record.put(field, std::mem::take(&mut values[i]))?;
            }
        }

        dest.push(record);
    }

    Ok(())
}
