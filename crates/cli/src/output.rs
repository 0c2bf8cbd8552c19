use crate::error::CliError;
use model::core::value::Value;
use serde::Serialize;

#[derive(Serialize)]
struct Compiled<'a> {
    sql: &'a str,
    params: &'a [Value],
}

fn render(sql: &str, params: &[Value], as_json: bool) -> Result<String, CliError> {
    if as_json {
        return Ok(serde_json::to_string_pretty(&Compiled { sql, params })?);
    }

    let mut out = sql.to_string();
    for (i, param) in params.iter().enumerate() {
        out.push_str(&format!("\n  ${} = {}", i + 1, param));
    }
    Ok(out)
}

pub fn write_compiled(
    sql: &str,
    params: &[Value],
    as_json: bool,
    path: Option<&str>,
) -> Result<(), CliError> {
    let rendered = render(sql, params, as_json)?;
    match path {
        Some(path) => std::fs::write(path, rendered)?,
        None => println!("{rendered}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::render;
    use model::core::value::Value;

    #[test]
    fn test_plain_output_lists_params() {
        let out = render("SELECT 1 WHERE a = $1", &[Value::Int(3)], false).unwrap();
        assert_eq!(out, "SELECT 1 WHERE a = $1\n  $1 = 3");
    }

    #[test]
    fn test_json_output() {
        let out = render("SELECT 1", &[], true).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["sql"], "SELECT 1");
        assert!(parsed["params"].as_array().unwrap().is_empty());
    }
}
