use crate::error::DriverError;

/// Number of character columns on the front-panel display.
pub const LCD_COLUMNS: usize = 16;
/// Number of rows on the front-panel display.
pub const LCD_ROWS: u8 = 2;

/// Builds the raw `[col][row][utf8 text]` payload of a display write.
///
/// With `full_line`, the text is padded with spaces to the end of the row so that leftovers of
/// a previous longer text are overwritten.
pub fn lcd_payload(text: &str, row: u8, col: u8, full_line: bool) -> Result<Vec<u8>, DriverError> {
    if row >= LCD_ROWS {
        return Err(DriverError::RowOutOfRange(row));
    }
    let len = text.chars().count();
    if len + col as usize > LCD_COLUMNS {
        return Err(DriverError::TextTooLong {
            text: text.to_owned(),
            col,
        });
    }

    let pad = if full_line {
        LCD_COLUMNS - col as usize - len
    } else {
        0
    };
    let mut payload = Vec::with_capacity(2 + text.len() + pad);
    payload.push(col);
    payload.push(row);
    payload.extend_from_slice(text.as_bytes());
    payload.resize(payload.len() + pad, b' ');
    Ok(payload)
}
