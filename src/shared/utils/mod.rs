use crate::shared::errors::{AppError, AppResult};
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use chrono_tz::Tz;

/// 金額の上限（10桁以内）
const MAX_AMOUNT: i64 = 9_999_999_999;

/// 入力された金額文字列をバリデーションして整数に変換する
///
/// # 引数
/// * `raw` - フォームに入力された金額
///
/// # 戻り値
/// 最小通貨単位の整数金額、または無効な場合はエラー
///
/// # バリデーション規則
/// - 空でないこと
/// - 数値であること
/// - 整数であること（小数点以下がある場合はエラー）
/// - 正の値で、10桁以内であること
pub fn parse_amount_input(raw: &str) -> AppResult<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("金額は必須項目です"));
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|_| AppError::validation("金額は数値で入力してください"))?;

    if !value.is_finite() {
        return Err(AppError::validation("無効な金額です"));
    }

    if value.fract() != 0.0 {
        return Err(AppError::validation("金額は整数で入力してください"));
    }

    if value <= 0.0 {
        return Err(AppError::validation("金額は正の数値で入力してください"));
    }

    if value > MAX_AMOUNT as f64 {
        return Err(AppError::validation("金額は10桁以内で入力してください"));
    }

    Ok(value as i64)
}

/// 文字列の長さバリデーション
pub fn validate_text_length(text: &str, max_length: usize, field_name: &str) -> AppResult<()> {
    let char_count = text.chars().count();
    if char_count > max_length {
        return Err(AppError::validation(format!(
            "{field_name}は{max_length}文字以内で入力してください（現在: {char_count}文字）"
        )));
    }
    Ok(())
}

/// 必須フィールドのバリデーション
pub fn validate_required_field(text: &str, field_name: &str) -> AppResult<()> {
    if text.trim().is_empty() {
        return Err(AppError::validation(format!("{field_name}は必須項目です")));
    }
    Ok(())
}

/// 説明文のバリデーション
///
/// # バリデーション規則
/// - 必須項目であること
/// - 255文字以内であること
pub fn validate_description(description: &str) -> AppResult<()> {
    validate_required_field(description, "説明")?;
    validate_text_length(description.trim(), 255, "説明")?;
    Ok(())
}

/// 金額を通貨表記でフォーマット（es-AR形式、小数なし）
///
/// # 引数
/// * `amount` - 金額
/// * `currency` - 通貨コード
///
/// # 戻り値
/// フォーマットされた金額文字列（例: `$ 1.234`）
pub fn format_amount(amount: i64, currency: &str) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let symbol = match currency {
        "ARS" | "USD" => "$",
        "EUR" => "€",
        "JPY" => "¥",
        other => other,
    };
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}{symbol} {grouped}")
}

/// 指定タイムゾーンでの週の開始（月曜0時）をUTCで取得する
///
/// # 引数
/// * `now` - 基準時刻
/// * `tz` - ユーザーのタイムゾーン
pub fn week_start(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let local_now = now.with_timezone(&tz);
    let days_from_monday = i64::from(local_now.weekday().num_days_from_monday());
    let monday = local_now.date_naive() - Duration::days(days_from_monday);

    // 月曜0時が存在しない場合（夏時間の切り替えなど）は最も早い時刻を使う
    monday
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| tz.from_local_datetime(&midnight).earliest())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or(now)
}

/// 文字列の正規化（前後の空白を削除）
pub fn normalize_string(text: &str) -> String {
    text.trim().to_string()
}
