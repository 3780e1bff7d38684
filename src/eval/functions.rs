//! Scalar built-in functions, matched case-insensitively.

use crate::error::{FedSqlError, Result};
use crate::value::Value;

/// Calls the named scalar function with already-evaluated arguments.
pub fn call(name: &str, args: Vec<Value>) -> Result<Value> {
    match name.to_ascii_uppercase().as_str() {
        "UPPER" => one_text(name, args, |s| s.to_uppercase()),
        "LOWER" => one_text(name, args, |s| s.to_lowercase()),
        "LENGTH" | "LEN" => {
            let arg = one_arg(name, args)?;
            Ok(if arg.is_null() {
                Value::Null
            } else {
                Value::Int(arg.to_text().chars().count() as i64)
            })
        }
        "TRIM" => one_text(name, args, |s| s.trim().to_string()),
        "LTRIM" => one_text(name, args, |s| s.trim_start().to_string()),
        "RTRIM" => one_text(name, args, |s| s.trim_end().to_string()),
        "SUBSTR" | "SUBSTRING" => substr(name, args),
        "CONCAT" => concat(args),
        "REPLACE" => replace(name, args),
        "INSTR" => instr(name, args),
        "ABS" => abs(name, args),
        "ROUND" => round(name, args),
        "FLOOR" => one_numeric(name, args, f64::floor),
        "CEIL" | "CEILING" => one_numeric(name, args, f64::ceil),
        "COALESCE" => Ok(args.into_iter().find(|v| !v.is_null()).unwrap_or(Value::Null)),
        "NULLIF" => nullif(name, args),
        "IFNULL" | "NVL" => ifnull(name, args),
        "CAST" => one_arg(name, args),
        other => Err(FedSqlError::UnknownFunction(other.to_string())),
    }
}

fn one_arg(name: &str, mut args: Vec<Value>) -> Result<Value> {
    if args.len() != 1 {
        return Err(FedSqlError::InvalidFunctionArgs {
            name: name.to_string(),
            reason: format!("expected 1 argument, got {}", args.len()),
        });
    }
    Ok(args.remove(0))
}

fn one_text(name: &str, args: Vec<Value>, f: impl FnOnce(&str) -> String) -> Result<Value> {
    let arg = one_arg(name, args)?;
    Ok(if arg.is_null() {
        Value::Null
    } else {
        Value::Text(f(&arg.to_text()))
    })
}

fn one_numeric(name: &str, args: Vec<Value>, f: impl FnOnce(f64) -> f64) -> Result<Value> {
    let arg = one_arg(name, args)?;
    if arg.is_null() {
        return Ok(Value::Null);
    }
    let n = arg.as_f64().ok_or_else(|| FedSqlError::InvalidFunctionArgs {
        name: name.to_string(),
        reason: "expected a numeric argument".to_string(),
    })?;
    Ok(Value::Float(f(n)))
}

fn substr(name: &str, args: Vec<Value>) -> Result<Value> {
    if args.len() < 2 || args.len() > 3 {
        return Err(FedSqlError::InvalidFunctionArgs {
            name: name.to_string(),
            reason: format!("expected 2 or 3 arguments, got {}", args.len()),
        });
    }
    if args.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }
    let s = args[0].to_text();
    let chars: Vec<char> = s.chars().collect();
    let start = args[1].as_f64().unwrap_or(1.0) as i64;
    let start_idx = (start.max(1) - 1) as usize;
    if start_idx >= chars.len() {
        return Ok(Value::Text(String::new()));
    }
    let len = args
        .get(2)
        .and_then(Value::as_f64)
        .map_or(chars.len() - start_idx, |l| (l.max(0.0) as usize).min(chars.len() - start_idx));
    Ok(Value::Text(chars[start_idx..start_idx + len].iter().collect()))
}

fn concat(args: Vec<Value>) -> Result<Value> {
    if args.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }
    Ok(Value::Text(args.iter().map(Value::to_text).collect()))
}

fn replace(name: &str, args: Vec<Value>) -> Result<Value> {
    if args.len() != 3 {
        return Err(FedSqlError::InvalidFunctionArgs {
            name: name.to_string(),
            reason: format!("expected 3 arguments, got {}", args.len()),
        });
    }
    if args.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }
    Ok(Value::Text(
        args[0].to_text().replace(&args[1].to_text(), &args[2].to_text()),
    ))
}

fn instr(name: &str, args: Vec<Value>) -> Result<Value> {
    if args.len() != 2 {
        return Err(FedSqlError::InvalidFunctionArgs {
            name: name.to_string(),
            reason: format!("expected 2 arguments, got {}", args.len()),
        });
    }
    if args.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }
    let haystack = args[0].to_text();
    let needle = args[1].to_text();
    let pos = haystack
        .char_indices()
        .position(|(byte_idx, _)| haystack[byte_idx..].starts_with(&needle));
    Ok(Value::Int(pos.map_or(0, |p| p as i64 + 1)))
}

fn abs(name: &str, args: Vec<Value>) -> Result<Value> {
    let arg = one_arg(name, args)?;
    match arg {
        Value::Null => Ok(Value::Null),
        Value::Int(i) => Ok(Value::Int(i.abs())),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        _ => Err(FedSqlError::InvalidFunctionArgs {
            name: name.to_string(),
            reason: "expected a numeric argument".to_string(),
        }),
    }
}

fn round(name: &str, args: Vec<Value>) -> Result<Value> {
    if args.is_empty() || args.len() > 2 {
        return Err(FedSqlError::InvalidFunctionArgs {
            name: name.to_string(),
            reason: format!("expected 1 or 2 arguments, got {}", args.len()),
        });
    }
    if args[0].is_null() {
        return Ok(Value::Null);
    }
    let n = args[0].as_f64().ok_or_else(|| FedSqlError::InvalidFunctionArgs {
        name: name.to_string(),
        reason: "expected a numeric argument".to_string(),
    })?;
    let digits = args.get(1).and_then(Value::as_f64).unwrap_or(0.0) as i32;
    let factor = 10f64.powi(digits);
    Ok(Value::Float((n * factor).round() / factor))
}

fn nullif(name: &str, args: Vec<Value>) -> Result<Value> {
    if args.len() != 2 {
        return Err(FedSqlError::InvalidFunctionArgs {
            name: name.to_string(),
            reason: format!("expected 2 arguments, got {}", args.len()),
        });
    }
    Ok(if args[0].loose_eq(&args[1]) {
        Value::Null
    } else {
        args[0].clone()
    })
}

fn ifnull(name: &str, mut args: Vec<Value>) -> Result<Value> {
    if args.len() != 2 {
        return Err(FedSqlError::InvalidFunctionArgs {
            name: name.to_string(),
            reason: format!("expected 2 arguments, got {}", args.len()),
        });
    }
    let fallback = args.remove(1);
    let first = args.remove(0);
    Ok(if first.is_null() { fallback } else { first })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_lower_propagate_null() {
        assert_eq!(call("UPPER", vec![Value::Null]).unwrap(), Value::Null);
        assert_eq!(
            call("upper", vec![Value::Text("hi".into())]).unwrap(),
            Value::Text("HI".into())
        );
    }

    #[test]
    fn length_counts_characters() {
        assert_eq!(
            call("LENGTH", vec![Value::Text("hello".into())]).unwrap(),
            Value::Int(5)
        );
    }

    #[test]
    fn substr_is_one_indexed() {
        assert_eq!(
            call(
                "SUBSTR",
                vec![Value::Text("hello".into()), Value::Int(2), Value::Int(3)]
            )
            .unwrap(),
            Value::Text("ell".into())
        );
    }

    #[test]
    fn instr_returns_zero_when_missing() {
        assert_eq!(
            call("INSTR", vec![Value::Text("hello".into()), Value::Text("z".into())]).unwrap(),
            Value::Int(0)
        );
        assert_eq!(
            call("INSTR", vec![Value::Text("hello".into()), Value::Text("ll".into())]).unwrap(),
            Value::Int(3)
        );
    }

    #[test]
    fn coalesce_returns_first_non_null() {
        assert_eq!(
            call("COALESCE", vec![Value::Null, Value::Null, Value::Int(7)]).unwrap(),
            Value::Int(7)
        );
    }

    #[test]
    fn nullif_returns_null_when_equal() {
        assert_eq!(
            call("NULLIF", vec![Value::Int(1), Value::Int(1)]).unwrap(),
            Value::Null
        );
        assert_eq!(
            call("NULLIF", vec![Value::Int(1), Value::Int(2)]).unwrap(),
            Value::Int(1)
        );
    }

    #[test]
    fn ifnull_falls_back_on_null() {
        assert_eq!(
            call("IFNULL", vec![Value::Null, Value::Int(5)]).unwrap(),
            Value::Int(5)
        );
    }

    #[test]
    fn cast_is_identity() {
        assert_eq!(
            call("CAST", vec![Value::Int(5)]).unwrap(),
            Value::Int(5)
        );
    }

    #[test]
    fn unknown_function_errors() {
        assert!(call("NOT_A_FN", vec![]).is_err());
    }
}
