use std::{env, sync::Arc};

use anyhow::Result;
use ftrender::{
    config::TextRenderConfig,
    font::FontEngine,
    render::WgpuBackend,
    text::{pipeline::GlyphMode, text_render::TextRender},
    window::{make_window, AppLoop},
};
use winit::{dpi::PhysicalSize, window::Window};

struct DrawText {
    backend: WgpuBackend,
    text: TextRender,
}

impl AppLoop for DrawText {
    fn init(window: Arc<Window>) -> Result<Self> {
        let mut backend = WgpuBackend::new(window)?;

        let font_path = env::args().nth(1).unwrap_or_else(|| "Roboto.ttf".into());
        let engine = FontEngine::new();
        let face = engine.load_face(&font_path)?;

        let mode = match env::var("FTRENDER_MODE").as_deref() {
            Ok("direct") => GlyphMode::Direct,
            _ => GlyphMode::Atlas,
        };
        let config = TextRenderConfig::default()
            .with_mode(mode)
            .with_atlas_dump(env::var_os("FTRENDER_ATLAS_PNG"));
        let text = TextRender::new(&mut backend, face, config)?;

        Ok(Self { backend, text })
    }

    fn draw(&mut self) -> Result<()> {
        self.backend.begin_frame()?;
        self.text.draw(&mut self.backend)?;
        self.backend.end_frame();
        Ok(())
    }

    fn resized(&mut self, new_size: PhysicalSize<u32>) {
        self.backend.resize(new_size);
    }
}

fn main() -> Result<()> {
    make_window()
        .with_window_size((700, 700))
        .with_title("draw-text")
        .run::<DrawText>()
}
