use crate::error::Error;
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// standard CHIP-8 resolution
pub const CHIP8_WIDTH: usize = 64;
pub const CHIP8_HEIGHT: usize = 32;

/// Display is used by the interpreter to draw things on the screen. It should
/// abstract the implementation details, so a variety of kinds of screen would
/// work. Coordinates passed in are already inside the surface.
pub trait Display {
    /// XOR `on` into the pixel at (x, y), returning what the pixel was before
    fn xor_pixel(&mut self, x: usize, y: usize, on: bool) -> bool;

    /// switch every pixel off
    fn clear(&mut self);

    fn width(&self) -> usize;

    fn height(&self) -> usize;

    /// show the current contents; called once per frame by the paced loop
    fn refresh(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// Draw `rows` as an 8-pixel-wide sprite with its top-left corner at
/// (`x`, `y`), one byte per row, most significant bit leftmost. Every pixel
/// wraps around the edges on its own. Returns 1 if any pixel was switched
/// off by the draw, else 0.
pub fn draw_sprite(display: &mut dyn Display, x: u8, y: u8, rows: &[u8]) -> u8 {
    let w = display.width();
    let h = display.height();
    let mut collision = false;
    for (row, pixels) in rows.iter().enumerate() {
        let py = (y as usize + row) & (h - 1);
        for bit in 0..8 {
            let on = pixels & (0x80 >> bit) != 0;
            let px = (x as usize + bit) % w;
            let was = display.xor_pixel(px, py, on);
            collision |= on && was;
        }
    }
    collision as u8
}

// store useful metadata about the surface: width, height, bitplanes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Resolution(usize, usize, usize);

impl Resolution {
    fn pixel_count(&self) -> usize {
        self.0 * self.1
    }

    fn byte_count(&self) -> usize {
        self.0 * self.1 * self.2 / 8
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    fn bitplane_from_data<'a>(
        &self,
        data: &'a [u8],
        bitplane: u8,
    ) -> impl std::iter::Iterator<Item = (f64, f64)> + 'a {
        let mut count = self.pixel_count();
        let w = self.0;
        std::iter::from_fn(move || {
            while count > 0 {
                count -= 1;
                let bit = 1 & (data[count / 8] >> (7 - count % 8));
                if bit == bitplane {
                    return Some((
                        (count % w) as f64,        // x
                        -1.0 * (count / w) as f64, // y
                    ));
                }
            }
            None
        })
    }
}

/// monochrome surface packed eight pixels to a byte, row-major, leftmost
/// pixel in the most significant bit. Also serves as a headless display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    resolution: Resolution,
    data: Vec<u8>,
}

impl Bitmap {
    /// `width` and `height` must be powers of two, `width` at least 8
    pub fn new(width: usize, height: usize) -> Self {
        assert!(
            width.is_power_of_two() && height.is_power_of_two() && width >= 8,
            "Bitmap dimensions must be powers of two"
        );
        let resolution = Resolution(width, height, 1);
        Bitmap {
            data: vec![0; resolution.byte_count()],
            resolution,
        }
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> bool {
        let (byte, mask) = self.locate(x, y);
        self.data[byte] & mask != 0
    }

    /// packed pixel data
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn lit_pixels(&self) -> usize {
        self.data.iter().map(|b| b.count_ones() as usize).sum()
    }

    fn locate(&self, x: usize, y: usize) -> (usize, u8) {
        let idx = y * self.resolution.0 + x;
        (idx / 8, 0x80 >> (idx % 8))
    }
}

impl Default for Bitmap {
    fn default() -> Self {
        Bitmap::new(CHIP8_WIDTH, CHIP8_HEIGHT)
    }
}

impl Display for Bitmap {
    fn xor_pixel(&mut self, x: usize, y: usize, on: bool) -> bool {
        let (byte, mask) = self.locate(x, y);
        let was = self.data[byte] & mask != 0;
        if on {
            self.data[byte] ^= mask;
        }
        was
    }

    fn clear(&mut self) {
        self.data.iter_mut().for_each(|b| *b = 0);
    }

    fn width(&self) -> usize {
        self.resolution.0
    }

    fn height(&self) -> usize {
        self.resolution.1
    }
}

/// monochrome display in a terminal, rendered using TUI and crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    bitmap: Bitmap,
}

impl MonoTermDisplay {
    pub fn new(x: usize, y: usize) -> Result<MonoTermDisplay, Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        // Terminal shows the cursor again when it is dropped
        terminal.hide_cursor()?;
        Ok(MonoTermDisplay {
            terminal,
            bitmap: Bitmap::new(x, y),
        })
    }
}

impl Display for MonoTermDisplay {
    fn xor_pixel(&mut self, x: usize, y: usize, on: bool) -> bool {
        self.bitmap.xor_pixel(x, y, on)
    }

    fn clear(&mut self) {
        self.bitmap.clear()
    }

    fn width(&self) -> usize {
        self.bitmap.width()
    }

    fn height(&self) -> usize {
        self.bitmap.height()
    }

    fn refresh(&mut self) -> Result<(), Error> {
        let resolution = self.bitmap.resolution;
        let data = self.bitmap.as_bytes();
        // for now this assumes a 1:1 ratio between terminal, chip8 and the
        // internal TUI canvas
        self.terminal.draw(|f| {
            let size = Rect::new(0, 0, 2 + resolution.0 as u16, 2 + resolution.1 as u16);

            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(resolution.x_bounds())
                .y_bounds(resolution.y_bounds())
                .marker(Marker::Block)
                .paint(|ctx| {
                    // lit pixels only; the block background is already black
                    ctx.draw(&Points {
                        coords: &resolution.bitplane_from_data(data, 1).collect::<Vec<_>>(),
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}
