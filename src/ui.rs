use crate::coerce::finite_or_zero;
use crate::models::{DashboardResponse, KpiRecord, MONTHS, Status};

pub fn render_index(dashboard: &DashboardResponse) -> String {
    INDEX_HTML
        .replace("{{PERIOD}}", &format!("{}/{}", dashboard.year, escape_html(&dashboard.month)))
        .replace("{{PERIOD_FORM}}", &period_form(dashboard))
        .replace("{{SETTINGS}}", &settings_section(dashboard))
        .replace("{{SUMMARY}}", &summary_section(dashboard))
        .replace("{{CROSS_TAB}}", &cross_tab_section(dashboard))
        .replace("{{RECORDS}}", &records_section(dashboard))
        .replace("{{LISTS}}", &lists_section(dashboard))
}

fn period_form(dashboard: &DashboardResponse) -> String {
    let options: String = MONTHS
        .iter()
        .map(|month| {
            let selected = if *month == dashboard.month { " selected" } else { "" };
            format!(r#"<option value="{month}"{selected}>{month}</option>"#)
        })
        .collect();
    format!(
        r#"<form class="inline" method="post" action="/period">
        <label>Year <input type="number" name="year" value="{}" /></label>
        <label>Month <select name="month">{options}</select></label>
        <button type="submit">Show</button>
      </form>"#,
        dashboard.year
    )
}

fn settings_section(dashboard: &DashboardResponse) -> String {
    let settings = &dashboard.settings;
    let preview: String = dashboard
        .preview
        .iter()
        .map(|sample| badge(sample.rate, sample.status))
        .collect();
    let warning = if dashboard.thresholds_inverted {
        r#"<p class="warning">Green is below yellow, so no rate can be at risk.</p>"#
    } else {
        ""
    };
    format!(
        r#"<form class="grid" method="post" action="/settings">
        <label>Sales weight % <input type="number" step="any" name="salesWeight" value="{}" /></label>
        <label>GP weight % <input type="number" step="any" name="gpWeight" value="{}" /></label>
        <label>Green &ge; <input type="number" step="any" name="green" value="{}" /></label>
        <label>Yellow &ge; <input type="number" step="any" name="yellow" value="{}" /></label>
        <button type="submit">Save settings</button>
      </form>
      <div class="legend">
        <span class="badge green">&ge; {}% green</span>
        <span class="badge yellow">&ge; {}% yellow</span>
        <span class="badge red">&lt; {}% red</span>
      </div>
      <div class="preview"><span class="label">Preview</span>{preview}</div>
      {warning}"#,
        settings.sales_weight,
        settings.gp_weight,
        settings.green,
        settings.yellow,
        settings.green,
        settings.yellow,
        settings.yellow,
    )
}

fn summary_section(dashboard: &DashboardResponse) -> String {
    let totals = &dashboard.totals;
    format!(
        r#"<div class="panel">
        <div class="stat"><span class="label">Sales</span><span class="value">{} / {}</span>{}</div>
        <div class="stat"><span class="label">Gross profit</span><span class="value">{} / {}</span>{}</div>
        <div class="stat"><span class="label">Composite</span><span class="value">{:.1}%</span>{}</div>
      </div>"#,
        format_amount(totals.sales_actual_sum),
        format_amount(totals.sales_target_sum),
        badge(totals.sales_rate, dashboard.sales_status),
        format_amount(totals.gp_actual_sum),
        format_amount(totals.gp_target_sum),
        badge(totals.gp_rate, dashboard.gp_status),
        totals.composite_rate,
        badge(totals.composite_rate, dashboard.composite_status),
    )
}

fn cross_tab_section(dashboard: &DashboardResponse) -> String {
    let tab = &dashboard.cross_tab;
    if tab.buyers.is_empty() {
        return r#"<p class="empty">No records for this period.</p>"#.to_string();
    }

    let mut html = String::from(r#"<table><thead><tr><th>Buyer / Category</th>"#);
    for category in &tab.categories {
        html.push_str(&format!("<th>{}</th>", escape_html(category)));
    }
    html.push_str("</tr></thead><tbody>");
    for (row, buyer) in tab.buyers.iter().enumerate() {
        html.push_str(&format!("<tr><th>{}</th>", escape_html(buyer)));
        for (column, cell) in tab.cells[row].iter().enumerate() {
            html.push_str(&format!(
                "<td>{} / {} {}</td>",
                format_amount(cell.actual_sum),
                format_amount(cell.target_sum),
                badge(cell.rate, dashboard.cross_tab_status[row][column])
            ));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

fn records_section(dashboard: &DashboardResponse) -> String {
    let mut html = String::from(
        r#"<table class="records"><thead><tr><th>Buyer</th><th>Category</th><th>Sales target</th><th>Sales actual</th><th>GP target</th><th>GP actual</th><th>Notes</th><th></th></tr></thead><tbody>"#,
    );
    for record in &dashboard.rows {
        html.push_str(&record_row(record));
    }
    html.push_str(&format!(
        r#"<tr class="new">
          <td><input form="new-record" name="buyer" list="buyer-options" value="{}" /></td>
          <td><input form="new-record" name="category" list="category-options" value="{}" /></td>
          <td><input form="new-record" type="number" step="any" name="salesTarget" value="0" /></td>
          <td><input form="new-record" type="number" step="any" name="salesActual" value="0" /></td>
          <td><input form="new-record" type="number" step="any" name="gpTarget" value="0" /></td>
          <td><input form="new-record" type="number" step="any" name="gpActual" value="0" /></td>
          <td><input form="new-record" name="notes" value="" /></td>
          <td>
            <form id="new-record" method="post" action="/records">
              <input type="hidden" name="year" value="{}" />
              <input type="hidden" name="month" value="{}" />
              <button type="submit">Add</button>
            </form>
          </td>
        </tr>"#,
        escape_html(dashboard.buyers.first().map(String::as_str).unwrap_or("")),
        escape_html(dashboard.categories.first().map(String::as_str).unwrap_or("")),
        dashboard.year,
        escape_html(&dashboard.month),
    ));
    html.push_str("</tbody></table>");
    html.push_str(&datalist("buyer-options", &dashboard.buyers));
    html.push_str(&datalist("category-options", &dashboard.categories));
    html
}

fn record_row(record: &KpiRecord) -> String {
    let form = format!("row-{}", escape_html(&record.id));
    let id = escape_html(&record.id);
    format!(
        r#"<tr>
          <td><input form="{form}" name="buyer" list="buyer-options" value="{}" /></td>
          <td><input form="{form}" name="category" list="category-options" value="{}" /></td>
          <td><input form="{form}" type="number" step="any" name="salesTarget" value="{}" /></td>
          <td><input form="{form}" type="number" step="any" name="salesActual" value="{}" /></td>
          <td><input form="{form}" type="number" step="any" name="gpTarget" value="{}" /></td>
          <td><input form="{form}" type="number" step="any" name="gpActual" value="{}" /></td>
          <td><input form="{form}" name="notes" value="{}" /></td>
          <td class="row-actions">
            <form id="{form}" method="post" action="/records/{id}"><button type="submit">Save</button></form>
            <form method="post" action="/records/{id}/delete"><button class="danger" type="submit">Delete</button></form>
          </td>
        </tr>"#,
        escape_html(&record.buyer),
        escape_html(&record.category),
        finite_or_zero(record.sales_target),
        finite_or_zero(record.sales_actual),
        finite_or_zero(record.gp_target),
        finite_or_zero(record.gp_actual),
        escape_html(&record.notes),
    )
}

fn lists_section(dashboard: &DashboardResponse) -> String {
    format!(
        r#"<div class="lists">{}{}</div>"#,
        label_list("Buyers", "/buyers", &dashboard.buyers),
        label_list("Categories", "/categories", &dashboard.categories)
    )
}

fn label_list(title: &str, action: &str, names: &[String]) -> String {
    let items: String = names
        .iter()
        .map(|name| {
            format!(
                r#"<li>{0}<form method="post" action="{action}/delete"><input type="hidden" name="name" value="{0}" /><button class="danger" type="submit">&times;</button></form></li>"#,
                escape_html(name)
            )
        })
        .collect();
    format!(
        r#"<div><h3>{title}</h3><ul>{items}</ul>
        <form class="inline" method="post" action="{action}"><input name="name" placeholder="New entry" /><button type="submit">Add</button></form></div>"#
    )
}

fn datalist(id: &str, names: &[String]) -> String {
    let options: String = names
        .iter()
        .map(|name| format!(r#"<option value="{}"></option>"#, escape_html(name)))
        .collect();
    format!(r#"<datalist id="{id}">{options}</datalist>"#)
}

fn badge(rate: f64, status: Status) -> String {
    format!(r#"<span class="badge {}">{rate:.1}%</span>"#, status.intent())
}

/// Thousands-separated amount with up to three decimals.
pub fn format_amount(value: f64) -> String {
    let rounded = (finite_or_zero(value) * 1000.0).round() / 1000.0;
    let sign = if rounded < 0.0 { "-" } else { "" };
    let text = rounded.abs().to_string();
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            ch => escaped.push(ch),
        }
    }
    escaped
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>KPI Tracker</title>
  <style>
    :root {
      --bg: #f4f6f8;
      --ink: #1f2933;
      --muted: #64748b;
      --card: #ffffff;
      --line: rgba(31, 41, 51, 0.08);
      --accent: #2f4858;
      --shadow: 0 12px 32px rgba(47, 72, 88, 0.12);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      background: var(--bg);
      color: var(--ink);
      font-family: "Segoe UI", "Helvetica Neue", sans-serif;
      padding: 24px 16px 48px;
    }

    .app {
      width: min(1200px, 100%);
      margin: 0 auto;
      display: grid;
      gap: 20px;
    }

    header h1 {
      margin: 0;
      font-size: 1.8rem;
    }

    header p {
      margin: 4px 0 0;
      color: var(--muted);
    }

    .card {
      background: var(--card);
      border-radius: 18px;
      border: 1px solid var(--line);
      box-shadow: var(--shadow);
      padding: 18px 20px;
    }

    .card h2 {
      margin: 0 0 12px;
      font-size: 1.1rem;
    }

    .grid {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(160px, 1fr));
      gap: 12px;
      align-items: end;
    }

    .inline {
      display: flex;
      flex-wrap: wrap;
      gap: 10px;
      align-items: end;
    }

    label {
      display: grid;
      gap: 4px;
      font-size: 0.8rem;
      color: var(--muted);
    }

    input,
    select {
      padding: 6px 8px;
      border-radius: 10px;
      border: 1px solid #cbd5e1;
      font: inherit;
      color: var(--ink);
      min-width: 0;
      width: 100%;
    }

    button {
      border: none;
      border-radius: 10px;
      padding: 7px 14px;
      background: var(--accent);
      color: white;
      font: inherit;
      cursor: pointer;
    }

    button.danger {
      background: #b91c1c;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(220px, 1fr));
      gap: 14px;
    }

    .stat {
      border: 1px solid var(--line);
      border-radius: 14px;
      padding: 14px;
      display: grid;
      gap: 6px;
    }

    .label {
      font-size: 0.75rem;
      text-transform: uppercase;
      letter-spacing: 0.1em;
      color: var(--muted);
      margin-right: 8px;
    }

    .value {
      font-size: 1.3rem;
      font-weight: 600;
    }

    .badge {
      display: inline-block;
      padding: 2px 8px;
      border-radius: 999px;
      font-size: 0.75rem;
      font-weight: 600;
      margin-right: 6px;
      width: fit-content;
    }

    .badge.green {
      background: #dcfce7;
      color: #15803d;
    }

    .badge.yellow {
      background: #fef9c3;
      color: #a16207;
    }

    .badge.red {
      background: #fee2e2;
      color: #b91c1c;
    }

    .legend,
    .preview {
      margin-top: 12px;
    }

    .warning {
      color: #a16207;
      font-size: 0.85rem;
    }

    table {
      width: 100%;
      border-collapse: collapse;
      font-size: 0.85rem;
    }

    th,
    td {
      text-align: left;
      padding: 6px;
      border-bottom: 1px solid var(--line);
      vertical-align: middle;
    }

    .row-actions {
      display: flex;
      gap: 6px;
    }

    .lists {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(260px, 1fr));
      gap: 16px;
    }

    .lists ul {
      list-style: none;
      padding: 0;
      display: grid;
      gap: 6px;
    }

    .lists li {
      display: flex;
      justify-content: space-between;
      align-items: center;
    }

    .exports {
      display: flex;
      gap: 10px;
    }

    .exports a {
      padding: 7px 14px;
      border-radius: 10px;
      background: #e2e8f0;
      color: var(--ink);
      text-decoration: none;
    }

    .empty {
      color: var(--muted);
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>KPI Tracker</h1>
      <p>Sales and gross profit, target vs. actual, for {{PERIOD}}</p>
    </header>

    <section class="card">
      <h2>Period</h2>
      {{PERIOD_FORM}}
    </section>

    <section class="card">
      <h2>Settings</h2>
      {{SETTINGS}}
    </section>

    <section class="card">
      <h2>Summary</h2>
      {{SUMMARY}}
    </section>

    <section class="card">
      <h2>Buyer &times; category</h2>
      {{CROSS_TAB}}
    </section>

    <section class="card">
      <h2>Records</h2>
      {{RECORDS}}
    </section>

    <section class="card">
      <h2>Buyers and categories</h2>
      {{LISTS}}
    </section>

    <section class="card">
      <h2>Download</h2>
      <div class="exports">
        <a href="/export/xlsx">XLSX</a>
        <a href="/export/csv">CSV</a>
        <a href="/export/pdf">PDF</a>
      </div>
    </section>
  </main>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppData;
    use crate::stats::build_dashboard;
    use chrono::NaiveDate;

    #[test]
    fn amounts_are_grouped_by_thousands() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(999.0), "999");
        assert_eq!(format_amount(1000.0), "1,000");
        assert_eq!(format_amount(12_000_000.0), "12,000,000");
        assert_eq!(format_amount(-1234567.5), "-1,234,567.5");
        assert_eq!(format_amount(f64::NAN), "0");
    }

    #[test]
    fn html_is_escaped() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn page_renders_every_section() {
        let mut data = AppData::seeded(NaiveDate::from_ymd_opt(2024, 9, 1).unwrap());
        data.rows[0].notes = "<script>alert(1)</script>".to_string();
        let html = render_index(&build_dashboard(&data));

        assert!(!html.contains("{{"));
        assert!(html.contains("2024/09"));
        assert!(html.contains(r#"<option value="09" selected>09</option>"#));
        assert!(html.contains("10,250,000 / 12,000,000"));
        assert!(html.contains(r#"<span class="badge red">85.4%</span>"#));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains(r#"href="/export/xlsx""#));
    }

    #[test]
    fn empty_period_says_so() {
        let mut data = AppData::seeded(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        data.settings.green = 90.0;
        let html = render_index(&build_dashboard(&data));
        assert!(html.contains("No records for this period."));
        assert!(html.contains("Green is below yellow"));
    }
}
