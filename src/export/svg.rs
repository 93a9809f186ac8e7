//! SVG projection of a genome.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::schema::{Gene, Genome, RenderStyle};

/// Write `genome` as an SVG document sized to the target.
///
/// Genes are emitted in draw order so later circles cover earlier ones.
/// Invisible genes are skipped.
pub fn write_svg<W: Write>(
    out: &mut W,
    genome: &Genome,
    (width, height): (u32, u32),
    style: RenderStyle,
) -> io::Result<()> {
    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}">"#
    )?;

    let [r, g, b, a] = style.background.rgba();
    if a > 0 {
        writeln!(
            out,
            r##"<rect width="100%" height="100%" fill="#{r:02x}{g:02x}{b:02x}"/>"##
        )?;
    }

    for gene in genome.genes().iter().filter(|g| g.is_visible()) {
        write_circle(out, gene)?;
    }

    writeln!(out, "</svg>")
}

fn write_circle<W: Write>(out: &mut W, gene: &Gene) -> io::Result<()> {
    let [r, g, b, a] = gene.color;
    write!(
        out,
        r##"<circle cx="{}" cy="{}" r="{}" fill="#{r:02x}{g:02x}{b:02x}""##,
        gene.x, gene.y, gene.radius
    )?;
    if a < 255 {
        write!(out, r#" fill-opacity="{:.3}""#, a as f32 / 255.0)?;
    }
    writeln!(out, "/>")
}

/// Write an SVG file.
pub fn save_svg<P: AsRef<Path>>(
    path: P,
    genome: &Genome,
    size: (u32, u32),
    style: RenderStyle,
) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_svg(&mut writer, genome, size, style)?;
    writer.flush()
}
