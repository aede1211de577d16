//! Provide the Station Loop.
//!
//! The station owns every collaborator for the lifetime of the process. The
//! camera and button lines are released when it is dropped, which happens on
//! Quit, on error and on normal return alike.

use crate::module::action::{self, Action, InputSource, Screen};
use crate::module::device::button::{Button, ButtonPad, Debouncer, GpioButtons};
use crate::module::error::{Result, StationError, ValidationError};
use crate::module::frontend::{Frontend, HeadlessFrontend, StatusLevel};
use crate::module::scheduler::{Clock, Scheduler, SystemClock, Task};
use crate::module::session::{CaptureSession, Pipeline, SessionState};
use crate::module::util::conf::Config;
use crate::module::util::init::StationProperty;
use crate::module::vector::fragment::CalibrationScalar;
use crate::module::vision::camera::{Camera, V4l2Camera};
use crate::module::vision::crop::{CropRegion, Point};
use crate::module::vision::lens::{LensModel, Undistorter};
use crate::module::vision::tracer::{Potrace, Tracer};

use std::time::Duration;

/// Whether the loop keeps going after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Start the station with the real hardware and block until Quit.
///
pub fn run(property: StationProperty) -> Result<()> {
    let conf = &property.conf;
    let scalar = CalibrationScalar::new(conf.pixels_per_unit()?)?;
    let pipeline = Pipeline::new(
        Undistorter::new(LensModel::from_config(&conf.lens)),
        Potrace::from_config(&conf.tracer),
        scalar,
        &conf.calibration.unit,
    );

    // init hardware
    let camera = V4l2Camera::new(&conf.camera)?;
    let buttons = GpioButtons::new(&conf.pin)?;
    let frontend = HeadlessFrontend::new(&property.path, conf);

    let mut station = Station::new(
        camera,
        buttons,
        frontend,
        CaptureSession::new(pipeline),
        SystemClock::new(),
        conf,
    );
    station.dispatch(Action::Configure);
    // Without a touchscreen nobody can draw a crop, so use the full frame.
    if !station.crop.is_finalized() {
        station.dispatch(Action::CropFinalize);
    }
    station.run();
    log::info!("Station stopped");
    Ok(())
}

/// Everything the kiosk owns.
///
pub struct Station<C: Camera, B: ButtonPad, F: Frontend, T: Tracer, K: Clock> {
    camera: C,
    buttons: B,
    frontend: F,
    session: CaptureSession<T>,
    crop: CropRegion,
    debouncer: Debouncer,
    scheduler: Scheduler<K>,
    preview_size: (u32, u32),
}

impl<C: Camera, B: ButtonPad, F: Frontend, T: Tracer, K: Clock> Station<C, B, F, T, K> {
    pub fn new(
        camera: C,
        buttons: B,
        frontend: F,
        session: CaptureSession<T>,
        clock: K,
        conf: &Config,
    ) -> Self {
        let scheduler = Scheduler::new(clock)
            .every(
                Task::RefreshPreview,
                Duration::from_millis(conf.preview.refresh_interval_ms),
            )
            .every(
                Task::PollButtons,
                Duration::from_millis(conf.button.poll_interval_ms),
            );

        let mut crop = CropRegion::new();
        if let Some(preset) = &conf.crop {
            crop.begin(Point::new(preset.x0, preset.y0));
            crop.finish(Point::new(preset.x1, preset.y1));
            crop.finalize();
        }

        Self {
            camera,
            buttons,
            frontend,
            session,
            crop,
            debouncer: Debouncer::new(Duration::from_millis(conf.button.debounce_ms)),
            scheduler,
            preview_size: (conf.camera.preview_width, conf.camera.preview_height),
        }
    }

    /// Captures and combines run to completion inside `dispatch`, so inputs
    /// are never looked up while one is in progress.
    pub fn screen(&self) -> Screen {
        match self.session.state() {
            SessionState::Idle => Screen::Idle,
            SessionState::Ready => Screen::Ready,
        }
    }

    /// Runs scheduled tasks until Quit.
    ///
    pub fn run(&mut self) {
        log::info!("Station running");
        while let Some(task) = self.scheduler.next() {
            let flow = match task {
                Task::RefreshPreview => self.refresh_preview(),
                Task::PollButtons => self.poll_buttons(),
            };
            if flow == Flow::Quit {
                break;
            }
        }
    }

    /// Shows one corrected live frame, then handles pending touches.
    ///
    /// A frame that cannot be grabbed is skipped; the next tick tries again.
    fn refresh_preview(&mut self) -> Flow {
        match self.camera.capture_frame() {
            Ok(frame) => {
                let frame = self.session.undistort_preview(&frame);
                self.preview_size = (frame.width(), frame.height());
                if let Err(e) = self.frontend.show_preview(&frame) {
                    log::warn!("Preview not shown: {}", e);
                }
            }
            Err(e) => log::warn!("Preview frame skipped: {}", e),
        }
        while let Some(touch) = self.frontend.poll_touch() {
            if self.handle(InputSource::Touch(touch)) == Flow::Quit {
                return Flow::Quit;
            }
        }
        Flow::Continue
    }

    fn poll_buttons(&mut self) -> Flow {
        let now = self.scheduler.clock().now();
        for button in Button::ALL {
            let pressed = self.buttons.is_pressed(button);
            if self.debouncer.update(button, pressed, now) {
                log::debug!("{:?} button pressed", button);
                if self.handle(InputSource::Button(button)) == Flow::Quit {
                    return Flow::Quit;
                }
            }
        }
        Flow::Continue
    }

    fn handle(&mut self, source: InputSource) -> Flow {
        let screen = self.screen();
        match action::lookup(screen, source) {
            Some(action) => self.dispatch(action),
            None => {
                log::debug!("{:?} ignored on {:?}", source, screen);
                Flow::Continue
            }
        }
    }

    /// Performs one action. Failures are reported to the operator and never end the loop.
    ///
    pub fn dispatch(&mut self, action: Action) -> Flow {
        match action {
            Action::Quit => {
                log::info!("Quit requested");
                return Flow::Quit;
            }
            Action::Configure => match self.frontend.request_location() {
                Some((dir, label)) => match self.session.configure(&dir, &label) {
                    Ok(()) => self.frontend.show_status(
                        &format!("Saving to {}", dir.join(&label).display()),
                        StatusLevel::Info,
                    ),
                    Err(e) => self.report(e),
                },
                None => self.report(ValidationError::NoOutputLocation.into()),
            },
            Action::Capture => {
                match self
                    .session
                    .capture(&mut self.camera, &self.crop, self.preview_size)
                {
                    Ok(outcome) => {
                        if let Err(e) = self
                            .frontend
                            .show_last_processed(&outcome.processed, outcome.count)
                        {
                            log::warn!("Last processed image not shown: {}", e);
                        }
                        self.frontend.show_status(
                            &format!("Photos processed: {}", outcome.count),
                            StatusLevel::Info,
                        );
                    }
                    Err(e) => self.report(e),
                }
            }
            Action::Combine => match self.session.combine() {
                Ok(path) => self.frontend.show_status(
                    &format!("All SVGs combined and saved as {}", path.display()),
                    StatusLevel::Info,
                ),
                Err(e) => self.report(e),
            },
            Action::CropBegin(p) => {
                self.crop.begin(p);
            }
            Action::CropUpdate(p) => {
                self.crop.update(p);
            }
            Action::CropFinish(p) => {
                self.crop.finish(p);
            }
            Action::CropFinalize => {
                self.crop.finalize();
                self.frontend
                    .show_status("Crop finalized", StatusLevel::Info);
            }
            Action::CropReset => {
                self.crop.reset();
                self.frontend.show_status("Crop reset", StatusLevel::Info);
            }
        }
        Flow::Continue
    }

    fn report(&mut self, err: StationError) {
        match &err {
            StationError::Validation(_) => log::warn!("{}", err),
            _ => log::error!("{}", err),
        }
        self.frontend.show_status(&err.to_string(), StatusLevel::Error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::action::TouchEvent;
    use crate::module::scheduler::ManualClock;
    use crate::module::util::conf;
    use crate::module::vector::VectorPath;
    use image::{DynamicImage, GrayImage, Luma};
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    impl Clock for Rc<ManualClock> {
        fn now(&self) -> Duration {
            (**self).now()
        }

        fn sleep(&self, duration: Duration) {
            (**self).sleep(duration)
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    struct MockCamera {
        failures: usize,
    }

    impl MockCamera {
        fn frame() -> DynamicImage {
            let mut img = GrayImage::from_pixel(64, 48, Luma([235]));
            for y in 10..30 {
                for x in 10..50 {
                    img.put_pixel(x, y, Luma([10]));
                }
            }
            DynamicImage::ImageLuma8(img)
        }
    }

    impl Camera for MockCamera {
        fn capture_frame(&mut self) -> Result<DynamicImage> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(StationError::Hardware("frame timeout".to_string()));
            }
            Ok(Self::frame())
        }

        fn capture_still(&mut self, path: &Path) -> Result<DynamicImage> {
            let still = Self::frame();
            still.save(path)?;
            Ok(still)
        }
    }

    /// Buttons held down during fixed time windows.
    struct ScriptedButtons {
        clock: Rc<ManualClock>,
        windows: Vec<(Button, u64, u64)>,
    }

    impl ButtonPad for ScriptedButtons {
        fn is_pressed(&self, button: Button) -> bool {
            let now = self.clock.now();
            self.windows
                .iter()
                .any(|&(b, from, to)| b == button && ms(from) <= now && now < ms(to))
        }
    }

    struct MockFrontend {
        location: Option<(PathBuf, String)>,
        touches: VecDeque<TouchEvent>,
        previews: usize,
        last_count: Option<usize>,
        statuses: Vec<(String, StatusLevel)>,
    }

    impl MockFrontend {
        fn new(location: Option<(PathBuf, String)>) -> Self {
            Self {
                location,
                touches: VecDeque::new(),
                previews: 0,
                last_count: None,
                statuses: Vec::new(),
            }
        }

        fn errors(&self) -> Vec<&str> {
            self.statuses
                .iter()
                .filter(|(_, l)| *l == StatusLevel::Error)
                .map(|(m, _)| m.as_str())
                .collect()
        }
    }

    impl Frontend for MockFrontend {
        fn request_location(&mut self) -> Option<(PathBuf, String)> {
            self.location.clone()
        }

        fn show_preview(&mut self, _frame: &DynamicImage) -> Result<()> {
            self.previews += 1;
            Ok(())
        }

        fn show_last_processed(&mut self, _image: &DynamicImage, count: usize) -> Result<()> {
            self.last_count = Some(count);
            Ok(())
        }

        fn show_status(&mut self, message: &str, level: StatusLevel) {
            self.statuses.push((message.to_string(), level));
        }

        fn poll_touch(&mut self) -> Option<TouchEvent> {
            self.touches.pop_front()
        }
    }

    struct FakeTracer;

    impl Tracer for FakeTracer {
        fn trace(&self, mask: &GrayImage, output: &Path) -> Result<VectorPath> {
            let svg = format!(
                "<svg width=\"{}pt\" height=\"{}pt\"><path d=\"M0 0\"/></svg>",
                mask.width(),
                mask.height()
            );
            std::fs::write(output, &svg)?;
            Ok(VectorPath::new(svg))
        }
    }

    type TestStation =
        Station<MockCamera, ScriptedButtons, MockFrontend, FakeTracer, Rc<ManualClock>>;

    fn station(
        conf: &Config,
        frontend: MockFrontend,
        windows: Vec<(Button, u64, u64)>,
        failures: usize,
    ) -> TestStation {
        let clock = Rc::new(ManualClock::default());
        let scalar = CalibrationScalar::new(conf.calibration.pixels_per_unit).unwrap();
        let session = CaptureSession::new(Pipeline::new(
            Undistorter::new(None),
            FakeTracer,
            scalar,
            &conf.calibration.unit,
        ));
        Station::new(
            MockCamera { failures },
            ScriptedButtons {
                clock: clock.clone(),
                windows,
            },
            frontend,
            session,
            clock,
            conf,
        )
    }

    #[test]
    fn full_session_test() {
        let dir = tempfile::tempdir().unwrap();
        let conf = conf::toml::default().unwrap();
        let mut front = MockFrontend::new(Some((dir.path().to_path_buf(), "bench".to_string())));
        front.touches.push_back(TouchEvent::ConfirmCrop);
        // Polls run every 100ms; each window covers exactly one poll.
        let windows = vec![
            (Button::Blue, 50, 150),   // configure
            (Button::Blue, 250, 350),  // capture
            (Button::Blue, 450, 550),  // capture
            (Button::Green, 650, 750), // combine
            (Button::Red, 850, 950),   // quit
        ];
        let mut st = station(&conf, front, windows, 0);
        assert_eq!(st.screen(), Screen::Idle);
        st.run();

        assert!(st.frontend.errors().is_empty(), "{:?}", st.frontend.statuses);
        assert_eq!(st.frontend.last_count, Some(2));
        assert_eq!(st.screen(), Screen::Ready);
        assert!(dir.path().join("bench/photos/captured_image_2.jpg").is_file());
        assert!(dir.path().join("bench/svgs/output_image_2.svg").is_file());
        assert!(dir.path().join("bench/combined_output.svg").is_file());
        assert!(st.session.fragments().is_empty());
        assert_eq!(st.scheduler.clock().now(), ms(900));
    }

    #[test]
    fn failed_preview_frame_is_skipped_test() {
        let conf = conf::toml::default().unwrap();
        let front = MockFrontend::new(None);
        let mut st = station(&conf, front, vec![(Button::Red, 250, 350)], 1);
        st.run();
        // Ticks at 50..=300; the first frame failed.
        assert_eq!(st.frontend.previews, 5);
        assert_eq!(st.preview_size, (64, 48));
    }

    #[test]
    fn validation_errors_are_reported_test() {
        let dir = tempfile::tempdir().unwrap();
        let conf = conf::toml::default().unwrap();
        let front = MockFrontend::new(Some((dir.path().to_path_buf(), "bench".to_string())));
        let windows = vec![
            (Button::Blue, 250, 350),  // capture without a finalized crop
            (Button::Green, 450, 550), // combine with nothing captured
            (Button::Red, 650, 750),
        ];
        let mut st = station(&conf, front, windows, 0);
        assert_eq!(st.dispatch(Action::Configure), Flow::Continue);
        st.run();
        assert_eq!(
            st.frontend.errors(),
            vec!["crop not finalized", "nothing to combine"]
        );
        assert!(st.session.fragments().is_empty());
    }

    #[test]
    fn back_to_back_captures_test() {
        let dir = tempfile::tempdir().unwrap();
        let conf = conf::toml::default().unwrap();
        let front = MockFrontend::new(Some((dir.path().to_path_buf(), "bench".to_string())));
        let windows = vec![
            (Button::Blue, 50, 150),  // configure
            (Button::Blue, 250, 350), // capture
            (Button::Blue, 450, 550), // capture
            (Button::Red, 650, 750),
        ];
        let mut st = station(&conf, front, windows, 0);
        st.dispatch(Action::CropFinalize);
        assert_eq!(st.dispatch(Action::Capture), Flow::Continue);
        assert_eq!(st.frontend.errors(), vec!["no output location"]);
        st.run();

        assert_eq!(st.screen(), Screen::Ready);
        assert_eq!(st.frontend.last_count, Some(2));
        assert_eq!(st.session.counter(), 2);
        assert!(dir.path().join("bench/photos/captured_image_2.jpg").is_file());
    }

    #[test]
    fn missing_location_test() {
        let conf = conf::toml::default().unwrap();
        let mut st = station(&conf, MockFrontend::new(None), vec![], 0);
        st.dispatch(Action::Configure);
        assert_eq!(st.screen(), Screen::Idle);
        assert_eq!(st.frontend.errors(), vec!["no output location"]);
        assert_eq!(st.dispatch(Action::Quit), Flow::Quit);
    }

    #[test]
    fn crop_preset_and_touch_test() {
        let mut conf = conf::toml::default().unwrap();
        conf.crop = Some(conf::Crop {
            x0: 40.0,
            y0: 30.0,
            x1: 8.0,
            y1: 4.0,
        });
        let mut st = station(&conf, MockFrontend::new(None), vec![], 0);
        assert!(st.crop.is_finalized());
        assert_eq!(
            st.crop.rect(),
            Some(crate::module::vision::crop::Rectangle::new(8.0, 4.0, 40.0, 30.0))
        );

        st.dispatch(Action::CropReset);
        st.frontend
            .touches
            .extend([
                TouchEvent::Down(Point::new(1.0, 2.0)),
                TouchEvent::Move(Point::new(5.0, 5.0)),
                TouchEvent::Up(Point::new(9.0, 7.0)),
            ]);
        assert_eq!(st.refresh_preview(), Flow::Continue);
        assert_eq!(
            st.crop.rect(),
            Some(crate::module::vision::crop::Rectangle::new(1.0, 2.0, 9.0, 7.0))
        );
        assert!(!st.crop.is_finalized());
    }
}
