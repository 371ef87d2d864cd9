//! RLE pattern reading.
//!
//! Just enough of the format to get library patterns into a universe:
//! `#` comment lines, the `x = .., y = ..` header (with an optional rule that
//! must be B3/S23), and the `b`/`o`/`$` run encoding terminated by `!`.
//!
//! See: https://conwaylife.com/wiki/Run_Length_Encoded

use anyhow::Context;
use anyhow::bail;

use crate::quadtree::node::Level;
use crate::quadtree::node::NodeId;
use crate::world::World;

/// A decoded pattern. Cell coordinates are zero-based from the pattern's own
/// top-left corner.
#[derive(Debug, Default)]
pub struct Pattern {
    pub width: i64,
    pub height: i64,
    pub cells: Vec<(i64, i64)>,
}

impl Pattern {
    /// The smallest level whose side length fits the pattern's bounding box.
    pub fn level(&self) -> Level {
        let side = self.width.max(self.height);

        let mut level: Level = 0;
        while (1i64 << level) < side {
            level += 1;
        }

        level
    }
}

/// Parse an RLE pattern. Assumes the bytes are valid ASCII.
pub fn parse(mut bytes: &[u8]) -> anyhow::Result<Pattern> {
    while let [b'#', ..] = bytes {
        (_, bytes) = split_line(bytes);
    }

    let (line, rest) = split_line(bytes);
    let (width, height) = read_header(line.trim_ascii()).context("Failed to parse RLE header")?;
    bytes = rest;

    let mut cells = Vec::new();
    let (mut x, mut y) = (0i64, 0i64);
    let mut rep: Option<i64> = None;
    let mut done = false;

    for &b in bytes {
        match b {
            b' ' | b'\t' | b'\r' | b'\n' => {}

            // End of input
            b'!' => {
                done = true;
                break;
            }

            // Dead cells
            b'b' => {
                x += rep.take().unwrap_or(1);
            }

            // Live cells
            b'o' => {
                let run = rep.take().unwrap_or(1);
                for i in 0..run {
                    cells.push((x + i, y));
                }

                x += run;
            }

            // End of row(s)
            b'$' => {
                y += rep.take().unwrap_or(1);
                x = 0;
            }

            d if d.is_ascii_digit() => {
                rep = Some(rep.unwrap_or(0) * 10 + (d - b'0') as i64);
            }

            b => bail!("Unrecognized character '{}'", b as char),
        }
    }

    if !done {
        bail!("Pattern is missing the '!' terminator");
    }

    Ok(Pattern { width, height, cells })
}

/// Parse a pattern and intern it, centered, into an empty node one level
/// above its bounding box so it has room to evolve.
pub fn load(world: &mut World, bytes: &[u8]) -> anyhow::Result<NodeId> {
    let pattern = parse(bytes)?;

    let level = (pattern.level() + 1).max(3);
    let side = 1i64 << level;

    let dx = (side - pattern.width) / 2;
    let dy = (side - pattern.height) / 2;

    let mut root = world.empty(level)?;
    for &(x, y) in &pattern.cells {
        root = world.set_cell(root, x + dx, y + dy, true)?;
    }

    Ok(root)
}

/// Parse `x = N, y = M` with an optional `, rule = B3/S23` tail.
fn read_header(bytes: &[u8]) -> anyhow::Result<(i64, i64)> {
    let bytes = expect(b'x', bytes)?;
    let bytes = take_ws(bytes);
    let bytes = expect(b'=', bytes)?;
    let (width, bytes) = take_number(bytes).context("Failed to parse pattern width")?;

    let bytes = expect(b',', take_ws(bytes))?;
    let bytes = take_ws(bytes);
    let bytes = expect(b'y', bytes)?;
    let bytes = take_ws(bytes);
    let bytes = expect(b'=', bytes)?;
    let (height, bytes) = take_number(bytes).context("Failed to parse pattern height")?;

    let bytes = take_ws(bytes);
    if let [b',', rest @ ..] = bytes {
        read_rule(rest)?;
    } else if !bytes.is_empty() {
        bail!("Trailing bytes after pattern height");
    }

    Ok((width, height))
}

/// Accept only Conway's rule; anything else is out of scope.
fn read_rule(bytes: &[u8]) -> anyhow::Result<()> {
    let bytes = take_ws(bytes);
    let bytes = bytes
        .strip_prefix(b"rule")
        .context("Expected a rule assignment after the pattern height")?;

    let bytes = take_ws(bytes);
    let bytes = expect(b'=', bytes)?;
    let rule = take_ws(bytes).trim_ascii();

    if !rule.eq_ignore_ascii_case(b"b3/s23") && rule != b"23/3".as_slice() {
        bail!("Only the B3/S23 rule is supported, found '{}'", String::from_utf8_lossy(rule));
    }

    Ok(())
}

/// Split at the first newline, dropping it. The whole slice is one line if
/// there is no newline.
fn split_line(bytes: &[u8]) -> (&[u8], &[u8]) {
    match bytes.iter().position(|&b| b == b'\n') {
        Some(i) => (&bytes[..i], &bytes[i + 1..]),
        None => (bytes, &[]),
    }
}

/// Consume leading ascii whitespace.
fn take_ws(mut bytes: &[u8]) -> &[u8] {
    while let [b, rest @ ..] = bytes {
        if !b.is_ascii_whitespace() {
            break;
        }

        bytes = rest;
    }

    bytes
}

/// Expect `b` next, consuming it.
fn expect(b: u8, bytes: &[u8]) -> anyhow::Result<&[u8]> {
    let [a, bytes @ ..] = bytes else {
        bail!("Expected '{}', found end of input", b as char)
    };

    if *a != b {
        bail!("Expected '{}', found '{}'", b as char, *a as char)
    }

    Ok(bytes)
}

/// Parse a decimal number, skipping leading whitespace.
fn take_number(bytes: &[u8]) -> anyhow::Result<(i64, &[u8])> {
    let mut bytes = take_ws(bytes);

    let mut n: Option<i64> = None;
    while let [d, rest @ ..] = bytes {
        if !d.is_ascii_digit() {
            break;
        }

        n = Some(n.unwrap_or(0) * 10 + (d - b'0') as i64);
        bytes = rest;
    }

    let Some(n) = n else {
        bail!("Expected a number")
    };

    Ok((n, bytes))
}
