use comfy_table::{Cell, Table};

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::get_data_dir;

pub fn list(from_date: Option<&str>, to_date: Option<&str>) -> Result<()> {
    let conn = get_connection(&get_data_dir().join("comptoir.db"))?;
    init_db(&conn)?;

    let mut sql = String::from(
        "SELECT date, client_id, client, seller_ref, is_validated, action, comment FROM quotations",
    );
    let mut conditions = Vec::new();
    let mut params: Vec<String> = Vec::new();
    if let Some(from) = from_date {
        params.push(from.to_string());
        conditions.push(format!("date >= ?{}", params.len()));
    }
    if let Some(to) = to_date {
        params.push(to.to_string());
        conditions.push(format!("date <= ?{}", params.len()));
    }
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" ORDER BY date, client_id");

    let mut stmt = conn.prepare(&sql)?;
    let rows: Vec<(String, String, String, String, bool, Option<String>, Option<String>)> = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["Date", "Client ID", "Client", "Seller", "Validated", "Action", "Comment"]);
    for (date, client_id, client, seller_ref, is_validated, action, comment) in rows {
        table.add_row(vec![
            Cell::new(date),
            Cell::new(client_id),
            Cell::new(client),
            Cell::new(seller_ref),
            Cell::new(if is_validated { "yes" } else { "no" }),
            Cell::new(action.unwrap_or_default()),
            Cell::new(comment.unwrap_or_default()),
        ]);
    }
    println!("Quotations\n{table}");
    Ok(())
}
