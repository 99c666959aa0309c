use scr_core::ComponentSnapshot;

/// Render snapshots as a fixed-width table
pub fn render_table(snapshots: &[ComponentSnapshot]) -> String {
    if snapshots.is_empty() {
        return "  No components registered.".to_string();
    }
    let width = snapshots
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());
    let mut out = format!("  {:<4} {:<width$} {:<12} {:<8} MODULE", "ID", "NAME", "STATE", "ENABLED");
    for snapshot in snapshots {
        let name = match snapshot.factory_of {
            Some(factory) => format!("{} (instance of {})", snapshot.name, factory),
            None => snapshot.name.clone(),
        };
        out.push_str(&format!(
            "\n  {:<4} {:<width$} {:<12} {:<8} {}/{}",
            snapshot.id, name, snapshot.state, snapshot.enabled, snapshot.module_name, snapshot.module_id
        ));
        if let Some(error) = &snapshot.last_error {
            out.push_str(&format!("\n       last error: {}", error));
        }
    }
    out
}

pub fn render_json(snapshots: &[ComponentSnapshot]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(snapshots)
}
