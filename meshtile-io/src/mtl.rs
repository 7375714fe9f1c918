//! MTL material library support

use crate::error::IoError;
use meshtile_core::Material;
use std::io::{BufRead, Write};

pub struct MtlReader;
pub struct MtlWriter;

impl MtlReader {
    /// Parse a material library. Only `newmtl`, `Kd` and `map_Kd` are kept;
    /// other statements are skipped.
    pub fn read_from<R: BufRead>(reader: R) -> std::result::Result<Vec<Material>, IoError> {
        let mut materials: Vec<Material> = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = i + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (keyword, rest) = match line.split_once(char::is_whitespace) {
                Some((k, r)) => (k, r.trim()),
                None => (line, ""),
            };

            match keyword {
                "newmtl" => {
                    if rest.is_empty() {
                        return Err(IoError::parse(line_no, "newmtl without a name"));
                    }
                    materials.push(Material::new(rest));
                }
                "Kd" => {
                    let Some(current) = materials.last_mut() else {
                        continue;
                    };
                    let rgb: Vec<f64> = rest
                        .split_whitespace()
                        .map(|t| t.parse::<f64>())
                        .collect::<std::result::Result<_, _>>()
                        .map_err(|_| IoError::parse(line_no, format!("invalid Kd '{}'", rest)))?;
                    if rgb.len() != 3 {
                        return Err(IoError::parse(line_no, "Kd expects three components"));
                    }
                    current.diffuse = Some([rgb[0], rgb[1], rgb[2]]);
                }
                "map_Kd" => {
                    if let Some(current) = materials.last_mut() {
                        // options such as -s or -o precede the file name
                        let file = rest.split_whitespace().last().unwrap_or_default();
                        if !file.is_empty() {
                            current.texture = Some(file.to_string());
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(materials)
    }
}

impl MtlWriter {
    pub fn write_to<W: Write>(materials: &[Material], writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "# meshtile material library")?;
        for material in materials {
            writeln!(writer)?;
            writeln!(writer, "newmtl {}", material.name)?;
            if let Some([r, g, b]) = material.diffuse {
                writeln!(writer, "Kd {} {} {}", r, g, b)?;
            }
            if let Some(texture) = &material.texture {
                writeln!(writer, "map_Kd {}", texture)?;
            }
        }
        Ok(())
    }
}
