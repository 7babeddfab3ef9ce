use comfy_table::{Cell, Table};

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::get_data_dir;

pub fn list() -> Result<()> {
    let conn = get_connection(&get_data_dir().join("comptoir.db"))?;
    init_db(&conn)?;

    let mut stmt = conn.prepare(
        "SELECT s.id, s.seller_ref, u.login, s.created_at FROM sellers s \
         LEFT JOIN users u ON u.id = s.user_id ORDER BY s.seller_ref",
    )?;
    let rows: Vec<(i64, String, Option<String>, String)> = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Reference", "Linked user", "Created"]);
    for (id, seller_ref, login, created_at) in rows {
        table.add_row(vec![
            Cell::new(id),
            Cell::new(seller_ref),
            Cell::new(login.unwrap_or_default()),
            Cell::new(created_at),
        ]);
    }
    println!("Sellers\n{table}");
    Ok(())
}
