use chrono::NaiveDate;
use regex::Regex;

/// Parses the `dd/mm/yyyy` dates the portals and the spreadsheet use.
pub fn parse_portal_date(text: &str) -> Result<NaiveDate, String> {
    let re = Regex::new(r"^\s*(\d{1,2})/(\d{1,2})/(\d{4})\s*$").map_err(|e| e.to_string())?;
    let captures = re
        .captures(text)
        .ok_or_else(|| format!("Fecha inválida: '{}'", text))?;

    let part = |i: usize| captures.get(i).map(|m| m.as_str()).unwrap_or_default();
    let day: u32 = part(1).parse().map_err(|_| format!("Día inválido: '{}'", text))?;
    let month: u32 = part(2).parse().map_err(|_| format!("Mes inválido: '{}'", text))?;
    let year: i32 = part(3).parse().map_err(|_| format!("Año inválido: '{}'", text))?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| format!("Fecha inexistente: '{}'", text))
}

pub fn format_portal_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}
