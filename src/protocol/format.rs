//! Argument formatting
//!
//! Commands carry their arguments as text produced from a printf-style
//! format string. The format is parsed once into a list of [`Conversion`]s,
//! which are checked against the typed [`Arg`] list before anything is
//! rendered. A count or type mismatch is a [`LinkError::Protocol`].
//!
//! Supported conversions: `%d %i %u %x %X %o %f %F %e %E %g %G %s %c %%`,
//! with flags `- + space 0 #`, a decimal width and `.precision`. C length
//! modifiers (`h hh l ll L z j t`) are accepted and ignored.

use std::fmt;

use crate::error::{LinkError, Result};

// =============================================================================
// Arguments
// =============================================================================

/// A single typed command argument
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
}

impl Arg {
    fn type_name(&self) -> &'static str {
        match self {
            Arg::Int(_) => "signed integer",
            Arg::UInt(_) => "unsigned integer",
            Arg::Float(_) => "float",
            Arg::Str(_) => "string",
        }
    }
}

macro_rules! arg_from {
    ($variant:ident as $target:ty: $($source:ty),+) => {
        $(
            impl From<$source> for Arg {
                fn from(value: $source) -> Self {
                    Arg::$variant(value as $target)
                }
            }
        )+
    };
}

arg_from!(Int as i64: i8, i16, i32, i64, isize);
arg_from!(UInt as u64: u8, u16, u32, u64, usize);
arg_from!(Float as f64: f32, f64);

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Str(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Str(value)
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Int(value as i64)
    }
}

/// Build an argument list from mixed values: `args![1, 2.5, "name"]`
#[macro_export]
macro_rules! args {
    () => { ::std::vec::Vec::<$crate::protocol::Arg>::new() };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::protocol::Arg::from($value)),+]
    };
}

// =============================================================================
// Conversions
// =============================================================================

/// Conversion character of a single `%` specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    Signed,
    Unsigned,
    Hex { upper: bool },
    Octal,
    Fixed { upper: bool },
    Exponent { upper: bool },
    General { upper: bool },
    Str,
    Char,
}

impl ConversionKind {
    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'd' | 'i' => ConversionKind::Signed,
            'u' => ConversionKind::Unsigned,
            'x' => ConversionKind::Hex { upper: false },
            'X' => ConversionKind::Hex { upper: true },
            'o' => ConversionKind::Octal,
            'f' => ConversionKind::Fixed { upper: false },
            'F' => ConversionKind::Fixed { upper: true },
            'e' => ConversionKind::Exponent { upper: false },
            'E' => ConversionKind::Exponent { upper: true },
            'g' => ConversionKind::General { upper: false },
            'G' => ConversionKind::General { upper: true },
            's' => ConversionKind::Str,
            'c' => ConversionKind::Char,
            _ => return None,
        })
    }

    fn is_numeric(&self) -> bool {
        !matches!(self, ConversionKind::Str | ConversionKind::Char)
    }
}

/// Flags, width and precision of a `%` specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
    pub left: bool,
    pub plus: bool,
    pub space: bool,
    pub zero: bool,
    pub alternate: bool,
}

/// One parsed `%` specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub kind: ConversionKind,
    pub flags: Flags,
    pub width: Option<usize>,
    pub precision: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Literal(String),
    Conversion(Conversion),
}

/// A parsed format string
#[derive(Debug, Clone, PartialEq)]
pub struct FormatSpec {
    pieces: Vec<Piece>,
}

impl FormatSpec {
    /// Parse a printf-style format string
    pub fn parse(format: &str) -> Result<Self> {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut chars = format.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }

            if let Some((_, '%')) = chars.peek() {
                chars.next();
                literal.push('%');
                continue;
            }

            let mut flags = Flags::default();
            while let Some(&(_, f)) = chars.peek() {
                match f {
                    '-' => flags.left = true,
                    '+' => flags.plus = true,
                    ' ' => flags.space = true,
                    '0' => flags.zero = true,
                    '#' => flags.alternate = true,
                    _ => break,
                }
                chars.next();
            }

            let width = take_number(&mut chars);
            let precision = match chars.peek() {
                Some((_, '.')) => {
                    chars.next();
                    Some(take_number(&mut chars).unwrap_or(0))
                }
                _ => None,
            };

            while let Some(&(_, m)) = chars.peek() {
                if matches!(m, 'h' | 'l' | 'L' | 'z' | 'j' | 't') {
                    chars.next();
                } else {
                    break;
                }
            }

            let kind = match chars.next() {
                Some((_, conv)) => ConversionKind::from_char(conv).ok_or_else(|| {
                    LinkError::Protocol(format!(
                        "Unsupported conversion '%{}' at offset {} in format {:?}",
                        conv, offset, format
                    ))
                })?,
                None => {
                    return Err(LinkError::Protocol(format!(
                        "Incomplete conversion at offset {} in format {:?}",
                        offset, format
                    )))
                }
            };

            if !literal.is_empty() {
                pieces.push(Piece::Literal(std::mem::take(&mut literal)));
            }
            pieces.push(Piece::Conversion(Conversion {
                kind,
                flags,
                width,
                precision,
            }));
        }

        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }

        Ok(Self { pieces })
    }

    /// The conversions in order of appearance
    pub fn conversions(&self) -> impl Iterator<Item = &Conversion> {
        self.pieces.iter().filter_map(|p| match p {
            Piece::Conversion(c) => Some(c),
            Piece::Literal(_) => None,
        })
    }

    /// Number of arguments this format consumes
    pub fn arg_count(&self) -> usize {
        self.conversions().count()
    }

    /// Check argument count and types without rendering
    pub fn validate(&self, args: &[Arg]) -> Result<()> {
        if self.arg_count() != args.len() {
            return Err(LinkError::Protocol(format!(
                "Format expects {} argument(s), got {}",
                self.arg_count(),
                args.len()
            )));
        }
        for (index, (conv, arg)) in self.conversions().zip(args).enumerate() {
            if !accepts(conv.kind, arg) {
                return Err(LinkError::Protocol(format!(
                    "Argument {} is a {} but conversion {:?} needs something else",
                    index + 1,
                    arg.type_name(),
                    conv.kind
                )));
            }
        }
        Ok(())
    }

    /// Substitute `args` into the format
    pub fn render(&self, args: &[Arg]) -> Result<String> {
        self.validate(args)?;

        let mut out = String::new();
        let mut args = args.iter();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Conversion(conv) => {
                    // validate() guarantees one argument per conversion
                    if let Some(arg) = args.next() {
                        render_one(&mut out, conv, arg);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Turn plain text values into arguments typed for each conversion
    ///
    /// Integers accept decimal or `0x` hex.
    pub fn coerce<S: AsRef<str>>(&self, values: &[S]) -> Result<Vec<Arg>> {
        if self.arg_count() != values.len() {
            return Err(LinkError::Protocol(format!(
                "Format expects {} argument(s), got {}",
                self.arg_count(),
                values.len()
            )));
        }

        self.conversions()
            .zip(values)
            .map(|(conv, value)| -> Result<Arg> {
                let text = value.as_ref();
                let bad = || {
                    LinkError::Protocol(format!(
                        "Cannot use {:?} for conversion {:?}",
                        text, conv.kind
                    ))
                };
                Ok(match conv.kind {
                    ConversionKind::Signed => Arg::Int(parse_int(text).ok_or_else(bad)?),
                    ConversionKind::Unsigned
                    | ConversionKind::Hex { .. }
                    | ConversionKind::Octal => Arg::UInt(parse_uint(text).ok_or_else(bad)?),
                    ConversionKind::Fixed { .. }
                    | ConversionKind::Exponent { .. }
                    | ConversionKind::General { .. } => {
                        Arg::Float(text.parse().map_err(|_| bad())?)
                    }
                    ConversionKind::Str | ConversionKind::Char => Arg::Str(text.to_string()),
                })
            })
            .collect()
    }
}

fn parse_uint(text: &str) -> Option<u64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn parse_int(text: &str) -> Option<i64> {
    match text.strip_prefix('-') {
        Some(rest) => parse_uint(rest)
            .and_then(|v| i64::try_from(v).ok())
            .map(|v| -v),
        None => parse_uint(text).and_then(|v| i64::try_from(v).ok()),
    }
}

impl fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => f.write_str(&text.replace('%', "%%"))?,
                Piece::Conversion(_) => f.write_str("%?")?,
            }
        }
        Ok(())
    }
}

/// Parse `format` and substitute `args` in one step
pub fn format_args(format: &str, args: &[Arg]) -> Result<String> {
    FormatSpec::parse(format)?.render(args)
}

fn take_number<I>(chars: &mut std::iter::Peekable<I>) -> Option<usize>
where
    I: Iterator<Item = (usize, char)>,
{
    let mut value: Option<usize> = None;
    while let Some(&(_, c)) = chars.peek() {
        match c.to_digit(10) {
            Some(d) => {
                value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(d as usize));
                chars.next();
            }
            None => break,
        }
    }
    value
}

fn accepts(kind: ConversionKind, arg: &Arg) -> bool {
    match kind {
        ConversionKind::Signed => match arg {
            Arg::Int(_) => true,
            Arg::UInt(v) => *v <= i64::MAX as u64,
            _ => false,
        },
        ConversionKind::Unsigned | ConversionKind::Hex { .. } | ConversionKind::Octal => {
            match arg {
                Arg::UInt(_) => true,
                Arg::Int(v) => *v >= 0,
                _ => false,
            }
        }
        ConversionKind::Fixed { .. }
        | ConversionKind::Exponent { .. }
        | ConversionKind::General { .. } => matches!(arg, Arg::Float(_)),
        ConversionKind::Str => matches!(arg, Arg::Str(_)),
        ConversionKind::Char => matches!(arg, Arg::Str(s) if s.chars().count() == 1),
    }
}

// =============================================================================
// Rendering
// =============================================================================

fn render_one(out: &mut String, conv: &Conversion, arg: &Arg) {
    let (prefix, body) = match (conv.kind, arg) {
        (ConversionKind::Signed, Arg::Int(v)) => signed(conv, *v as i128),
        (ConversionKind::Signed, Arg::UInt(v)) => signed(conv, *v as i128),
        (kind, Arg::UInt(v)) => unsigned(conv, kind, *v),
        (kind, Arg::Int(v)) => unsigned(conv, kind, *v as u64),
        (_, Arg::Float(v)) => float(conv, *v),
        (ConversionKind::Str, Arg::Str(s)) => match conv.precision {
            Some(p) => (String::new(), s.chars().take(p).collect()),
            None => (String::new(), s.clone()),
        },
        (_, Arg::Str(s)) => (String::new(), s.chars().take(1).collect()),
    };

    pad(out, conv, &prefix, &body);
}

fn sign_prefix(flags: &Flags, negative: bool) -> String {
    if negative {
        "-".to_string()
    } else if flags.plus {
        "+".to_string()
    } else if flags.space {
        " ".to_string()
    } else {
        String::new()
    }
}

fn min_digits(digits: String, precision: Option<usize>) -> String {
    match precision {
        Some(0) if digits == "0" => String::new(),
        Some(p) if digits.len() < p => format!("{}{}", "0".repeat(p - digits.len()), digits),
        _ => digits,
    }
}

fn signed(conv: &Conversion, value: i128) -> (String, String) {
    let digits = min_digits(value.unsigned_abs().to_string(), conv.precision);
    (sign_prefix(&conv.flags, value < 0), digits)
}

fn unsigned(conv: &Conversion, kind: ConversionKind, value: u64) -> (String, String) {
    let (prefix, digits) = match kind {
        ConversionKind::Hex { upper } => {
            let digits = if upper {
                format!("{:X}", value)
            } else {
                format!("{:x}", value)
            };
            let prefix = match (conv.flags.alternate && value != 0, upper) {
                (true, true) => "0X",
                (true, false) => "0x",
                _ => "",
            };
            (prefix.to_string(), digits)
        }
        ConversionKind::Octal => {
            let prefix = if conv.flags.alternate && value != 0 { "0" } else { "" };
            (prefix.to_string(), format!("{:o}", value))
        }
        _ => (String::new(), value.to_string()),
    };
    (prefix, min_digits(digits, conv.precision))
}

fn float(conv: &Conversion, value: f64) -> (String, String) {
    let upper = matches!(
        conv.kind,
        ConversionKind::Fixed { upper: true }
            | ConversionKind::Exponent { upper: true }
            | ConversionKind::General { upper: true }
    );
    let prefix = sign_prefix(&conv.flags, value.is_sign_negative() && !value.is_nan());
    let magnitude = value.abs();

    let body = if magnitude.is_nan() {
        "nan".to_string()
    } else if magnitude.is_infinite() {
        "inf".to_string()
    } else {
        let precision = conv.precision.unwrap_or(6);
        match conv.kind {
            ConversionKind::Exponent { .. } => exponent(magnitude, precision),
            ConversionKind::General { .. } => general(magnitude, precision, conv.flags.alternate),
            _ => format!("{:.*}", precision, magnitude),
        }
    };

    let body = if upper { body.to_uppercase() } else { body };
    (prefix, body)
}

/// C-style `%e`: mantissa, `e`, sign and at least two exponent digits
fn exponent(value: f64, precision: usize) -> String {
    let rendered = format!("{:.*e}", precision, value);
    match rendered.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => rendered,
    }
}

/// C-style `%g`: shortest of fixed/exponent with trailing zeros removed
fn general(value: f64, precision: usize, keep_zeros: bool) -> String {
    let precision = precision.max(1);
    let exp = if value == 0.0 {
        0
    } else {
        // exponent after rounding to `precision` significant digits
        let rendered = format!("{:.*e}", precision - 1, value);
        rendered
            .split_once('e')
            .and_then(|(_, e)| e.parse::<i32>().ok())
            .unwrap_or(0)
    };

    let body = if exp < -4 || exp >= precision as i32 {
        exponent(value, precision - 1)
    } else {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        format!("{:.*}", decimals, value)
    };

    if keep_zeros {
        return body;
    }
    strip_trailing_zeros(&body)
}

fn strip_trailing_zeros(body: &str) -> String {
    let (mantissa, suffix) = match body.find('e') {
        Some(i) => body.split_at(i),
        None => (body, ""),
    };
    if !mantissa.contains('.') {
        return body.to_string();
    }
    let trimmed = mantissa.trim_end_matches('0').trim_end_matches('.');
    format!("{}{}", trimmed, suffix)
}

fn pad(out: &mut String, conv: &Conversion, prefix: &str, body: &str) {
    let len = prefix.chars().count() + body.chars().count();
    let fill = conv.width.unwrap_or(0).saturating_sub(len);

    if conv.flags.left {
        out.push_str(prefix);
        out.push_str(body);
        out.extend(std::iter::repeat(' ').take(fill));
        return;
    }

    let integer = matches!(
        conv.kind,
        ConversionKind::Signed
            | ConversionKind::Unsigned
            | ConversionKind::Hex { .. }
            | ConversionKind::Octal
    );
    let zero_pad = conv.flags.zero
        && conv.kind.is_numeric()
        && !(integer && conv.precision.is_some())
        && body.chars().all(|c| c.is_ascii_hexdigit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));

    if zero_pad {
        out.push_str(prefix);
        out.extend(std::iter::repeat('0').take(fill));
    } else {
        out.extend(std::iter::repeat(' ').take(fill));
        out.push_str(prefix);
    }
    out.push_str(body);
}
