use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use log::{error, info};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

pub trait AppLoop: Sized {
    fn init(window: Arc<Window>) -> Result<Self>;

    fn draw(&mut self) -> Result<()>;

    fn resized(&mut self, _new_size: PhysicalSize<u32>) {}
}

pub struct App {
    title: String,
    frame_rate: f32,
    window_size: (u32, u32),
}

impl App {
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_framerate(mut self, frame_rate: f32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_size = window_size;
        self
    }

    fn frame_time(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.frame_rate.max(1.0))
    }

    /// Opens the window and drives `T` until the window closes or a frame fails.
    pub fn run<T: AppLoop>(self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        let mut runner = Runner::<T> {
            app: self,
            window: None,
            app_loop: None,
            last_frame: Instant::now(),
            error: None,
        };
        event_loop.run_app(&mut runner)?;

        match runner.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct Runner<T> {
    app: App,
    window: Option<Arc<Window>>,
    app_loop: Option<T>,
    last_frame: Instant,
    error: Option<anyhow::Error>,
}

impl<T: AppLoop> Runner<T> {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{:#}", err);
        self.error = Some(err);
        event_loop.exit();
    }
}

impl<T: AppLoop> ApplicationHandler for Runner<T> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = self.app.window_size;
        let attributes = Window::default_attributes()
            .with_title(self.app.title.clone())
            .with_inner_size(LogicalSize::new(width, height));
        let created = event_loop
            .create_window(attributes)
            .map_err(anyhow::Error::from)
            .and_then(|window| {
                let window = Arc::new(window);
                let app_loop = T::init(window.clone())?;
                Ok((window, app_loop))
            });

        match created {
            Ok((window, app_loop)) => {
                info!("opened window {:?}", self.app.title);
                window.request_redraw();
                self.window = Some(window);
                self.app_loop = Some(app_loop);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(new_size) => {
                if let Some(app_loop) = self.app_loop.as_mut() {
                    app_loop.resized(new_size);
                }
            }
            WindowEvent::RedrawRequested => {
                self.last_frame = Instant::now();
                let drawn = match self.app_loop.as_mut() {
                    Some(app_loop) => app_loop.draw(),
                    None => Ok(()),
                };
                if let Err(err) = drawn {
                    self.fail(event_loop, err);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let next_frame = self.last_frame + self.app.frame_time();
        if Instant::now() >= next_frame {
            if let Some(window) = self.window.as_ref() {
                window.request_redraw();
            }
        } else {
            event_loop.set_control_flow(ControlFlow::WaitUntil(next_frame));
        }
    }
}

pub fn make_window() -> App {
    env_logger::init();

    App {
        title: "ftrender".into(),
        frame_rate: 60.0,
        window_size: (800, 600),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App {
            title: "test".into(),
            frame_rate: 60.0,
            window_size: (1, 1),
        }
    }

    #[test]
    fn test_frame_time_follows_frame_rate() {
        let app = app().with_framerate(50.0);
        assert!((app.frame_time().as_secs_f64() - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_zero_frame_rate_does_not_divide_by_zero() {
        let app = app().with_framerate(0.0);
        assert_eq!(app.frame_time(), Duration::from_secs(1));
    }
}
