/// core-lib/src/clock.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::joypad::Button;
use crate::system::GameBoy;

/// Host-time length of one emulated frame: 70,224 T-cycles at 4.194304 MHz
/// (~59.73 Hz).
pub const FRAME_DURATION: Duration = Duration::from_nanos(16_742_706);

enum Command {
    Button(Button, bool),
    Volume(f32),
}

/// Runs a [`GameBoy`] at real-time pace on a dedicated worker thread.
///
/// The worker emulates whole frames and sleeps to the next 59.73 Hz
/// boundary on the host monotonic clock. When the host falls more than one
/// frame behind, the backlog is dropped rather than caught up. Input and
/// volume changes are queued through a channel and applied at the next
/// frame boundary, which serialises them against emulation.
pub struct Clock {
    commands: mpsc::Sender<Command>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<GameBoy>>,
}

impl Clock {
    /// Takes ownership of the machine and starts the frame loop.
    #[must_use]
    pub fn start(mut system: GameBoy) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let (commands, inbox) = mpsc::channel::<Command>();

        let worker = thread::spawn(move || {
            debug!("clock worker started");
            let mut deadline = Instant::now();
            while flag.load(Ordering::Relaxed) {
                for command in inbox.try_iter() {
                    match command {
                        Command::Button(button, pressed) => system.set_button(button, pressed),
                        Command::Volume(volume) => system.set_volume(volume),
                    }
                }

                system.step_frame();

                deadline += FRAME_DURATION;
                let now = Instant::now();
                if now < deadline {
                    thread::sleep(deadline - now);
                } else if now - deadline > FRAME_DURATION {
                    // More than a frame behind: drop the backlog.
                    deadline = now;
                }
            }
            debug!("clock worker stopped");
            system
        });

        Self {
            commands,
            running,
            worker: Some(worker),
        }
    }

    /// Queues a button transition; it lands before the next frame.
    pub fn set_button(&self, button: Button, pressed: bool) {
        let _ = self.commands.send(Command::Button(button, pressed));
    }

    /// Queues a master-volume change.
    pub fn set_volume(&self, volume: f32) {
        let _ = self.commands.send(Command::Volume(volume));
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Cooperative shutdown: the worker finishes its current frame, then
    /// the machine is handed back.
    pub fn stop(mut self) -> Option<GameBoy> {
        self.running.store(false, Ordering::Relaxed);
        self.worker.take().and_then(|worker| worker.join().ok())
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
