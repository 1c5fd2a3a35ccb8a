use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal};
use std::os::fd::{AsRawFd, RawFd};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Backend,
    Keyboard,
    Interrupted,
}

/// The descriptor the terminal library reads keys from, plus the blocking
/// wait across it and the engine's notification channel.
pub struct InputSource {
    _tty: Option<File>,
    fd: RawFd,
    wake: Option<RawFd>,
}

impl InputSource {
    /// Uses stdin when it is a terminal, `/dev/tty` otherwise, like crossterm does.
    pub fn open() -> io::Result<Self> {
        let stdin = io::stdin();
        if stdin.is_terminal() {
            return Ok(Self {
                _tty: None,
                fd: stdin.as_raw_fd(),
                wake: None,
            });
        }

        let tty = OpenOptions::new().read(true).open("/dev/tty")?;
        let fd = tty.as_raw_fd();
        Ok(Self {
            _tty: Some(tty),
            fd,
            wake: None,
        })
    }

    /// Waits on an arbitrary descriptor; the caller keeps it open.
    pub fn with_fd(fd: RawFd) -> Self {
        Self {
            _tty: None,
            fd,
            wake: None,
        }
    }

    /// Also wait on a non-blocking pipe that a signal handler writes to.
    pub fn watch_wake_pipe(mut self, wake: Option<RawFd>) -> Self {
        self.wake = wake;
        self
    }

    /// Blocks until the backend or the keyboard is ready. A pending wake
    /// byte wins over both, then backend readiness over the keyboard. With
    /// `buffered_keys` the wait does not block, since the terminal library
    /// already holds input the kernel won't report.
    pub fn wait(&self, backend: Option<RawFd>, buffered_keys: bool) -> io::Result<Readiness> {
        let mut fds = Vec::with_capacity(3);
        if let Some(fd) = self.wake {
            fds.push(libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            });
        }
        let backend_slot = fds.len();
        if let Some(fd) = backend {
            fds.push(libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            });
        }
        fds.push(libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        });

        let timeout = if buffered_keys { 0 } else { -1 };
        // SAFETY: `fds` is a live, correctly sized array of pollfd.
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(Readiness::Interrupted);
            }
            return Err(err);
        }

        if self.wake.is_some() && fds[0].revents & libc::POLLIN != 0 {
            drain(fds[0].fd);
            return Ok(Readiness::Interrupted);
        }

        let backend_ready = backend.is_some()
            && fds[backend_slot].revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0;
        if backend_ready {
            Ok(Readiness::Backend)
        } else {
            Ok(Readiness::Keyboard)
        }
    }
}

fn drain(fd: RawFd) {
    let mut buf = [0u8; 64];
    // SAFETY: `buf` is live for the call; poll reported the fd readable.
    unsafe {
        libc::read(fd, buf.as_mut_ptr().cast(), buf.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::net::UnixStream;

    #[test]
    fn backend_wins_when_both_are_ready() {
        let (keyboard, mut keys) = UnixStream::pair().expect("pair");
        let (engine, mut notifications) = UnixStream::pair().expect("pair");
        keys.write_all(b"j").expect("write");
        notifications.write_all(b"{}\n").expect("write");

        let input = InputSource::with_fd(keyboard.as_raw_fd());
        assert_eq!(
            input.wait(Some(engine.as_raw_fd()), false).expect("wait"),
            Readiness::Backend
        );
    }

    #[test]
    fn keyboard_is_reported_when_backend_is_quiet() {
        let (keyboard, mut keys) = UnixStream::pair().expect("pair");
        let (engine, _notifications) = UnixStream::pair().expect("pair");
        keys.write_all(b"j").expect("write");

        let input = InputSource::with_fd(keyboard.as_raw_fd());
        assert_eq!(
            input.wait(Some(engine.as_raw_fd()), false).expect("wait"),
            Readiness::Keyboard
        );
        assert_eq!(input.wait(None, false).expect("wait"), Readiness::Keyboard);
    }

    #[test]
    fn hangup_counts_as_backend_ready() {
        let (keyboard, _keys) = UnixStream::pair().expect("pair");
        let (engine, notifications) = UnixStream::pair().expect("pair");
        drop(notifications);

        let input = InputSource::with_fd(keyboard.as_raw_fd());
        assert_eq!(
            input.wait(Some(engine.as_raw_fd()), false).expect("wait"),
            Readiness::Backend
        );
    }

    #[test]
    fn buffered_keys_do_not_block() {
        let (keyboard, _keys) = UnixStream::pair().expect("pair");
        let input = InputSource::with_fd(keyboard.as_raw_fd());
        assert_eq!(input.wait(None, true).expect("wait"), Readiness::Keyboard);
    }

    #[test]
    fn wake_byte_wins_over_ready_sources_and_is_consumed() {
        let (keyboard, mut keys) = UnixStream::pair().expect("pair");
        let (engine, mut notifications) = UnixStream::pair().expect("pair");
        let (wake, mut waker) = UnixStream::pair().expect("pair");
        keys.write_all(b"j").expect("write");
        notifications.write_all(b"{}\n").expect("write");
        waker.write_all(b"\x01").expect("write");

        let input = InputSource::with_fd(keyboard.as_raw_fd()).watch_wake_pipe(Some(wake.as_raw_fd()));
        assert_eq!(
            input.wait(Some(engine.as_raw_fd()), false).expect("wait"),
            Readiness::Interrupted
        );
        assert_eq!(
            input.wait(Some(engine.as_raw_fd()), false).expect("wait"),
            Readiness::Backend
        );
    }
}
