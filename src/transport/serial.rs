//! # Serial TTY Transport
//!
//! Reads the print stream from a serial device: a USB serial adapter on the
//! legacy interface, or the DTR-handshake interface (TULIP4041).
//!
//! ## TTY Configuration
//!
//! The device is opened in raw mode so every byte arrives unmodified. Codes
//! 0x11 and 0x13 are ordinary glyphs in this protocol, so XON/XOFF flow
//! control must be off.
//!
//! - **No input processing**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR, ICRNL, IXON, IXOFF, IXANY cleared
//! - **No output processing**: OPOST cleared
//! - **Non-canonical, no echo**: ECHO, ECHONL, ICANON, ISIG, IEXTEN cleared
//! - **Framing**: data bits, stop bits and parity from [`SerialConfig`]
//! - **Reads**: VMIN 0, VTIME 1, so a read returns after at most 100ms
//!
//! ## DTR
//!
//! With `dtr` set the DTR modem line is asserted after configuration and
//! dropped again when the transport is closed.
//!
//! ## Port Discovery
//!
//! [`list_ports`] scans `/dev` for serial adapters. [`preferred_port`] picks
//! a USB serial adapter when there is one, otherwise the first port found.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::ByteSource;
use crate::config::{Parity, SerialConfig};
use crate::error::Hp41PrintError;

/// Directory scanned for serial devices
pub const DEVICE_DIR: &str = "/dev";

/// Device name prefixes that look like serial ports
const PORT_PREFIXES: [&str; 4] = ["ttyUSB", "ttyACM", "rfcomm", "cu."];

/// Substring marking a USB serial adapter, preferred as the default port
pub const PREFERRED_PORT_HINT: &str = "usbserial";

/// Read timeout, in tenths of a second (VTIME)
const READ_TIMEOUT_DECISECONDS: u8 = 1;

/// # Serial Printer Transport
///
/// An open, configured serial device.
///
/// ## Example
///
/// ```no_run
/// use hp41print::config::SerialConfig;
/// use hp41print::transport::{ByteSource, SerialTransport};
///
/// let config = SerialConfig { dtr: true, ..Default::default() };
/// let mut transport = SerialTransport::open("/dev/ttyUSB0", &config)?;
///
/// let mut buf = [0u8; 256];
/// while let Some(n) = transport.read_chunk(&mut buf)? {
///     println!("{} bytes", n);
/// }
/// # Ok::<(), hp41print::error::Hp41PrintError>(())
/// ```
#[derive(Debug)]
pub struct SerialTransport {
    file: File,
    path: PathBuf,
    dtr: bool,
}

impl SerialTransport {
    /// Open and configure a serial device.
    ///
    /// ## Errors
    ///
    /// Returns an error if:
    /// - The settings fail [`SerialConfig::validate`]
    /// - The device doesn't exist or permission is denied (may need the dialout group)
    /// - The baud rate isn't supported by the platform
    /// - TTY configuration or DTR assertion fails
    pub fn open<P: AsRef<Path>>(device: P, config: &SerialConfig) -> Result<Self, Hp41PrintError> {
        config.validate()?;
        let path = device.as_ref();

        let file = open_device(path).map_err(|e| {
            Hp41PrintError::Transport(format!("Failed to open {}: {}", path.display(), e))
        })?;

        configure_tty(&file, config)?;
        if config.dtr {
            set_dtr(&file, true)?;
        }

        info!(
            "opened {} at {} baud, {}{}{}, mode {}",
            path.display(),
            config.baud_rate,
            config.data_bits,
            parity_letter(config.parity),
            config.stop_bits,
            config.mode()
        );

        Ok(Self {
            file,
            path: path.to_path_buf(),
            dtr: config.dtr,
        })
    }

    /// Open the configured device, or the preferred discovered port.
    pub fn open_config(config: &SerialConfig) -> Result<Self, Hp41PrintError> {
        match &config.device {
            Some(device) => Self::open(device, config),
            None => {
                let ports = list_ports()?;
                let port = preferred_port(&ports).ok_or_else(|| {
                    Hp41PrintError::Transport("No serial ports found".to_string())
                })?;
                Self::open(port, config)
            }
        }
    }

    /// Device path this transport was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for SerialTransport {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Hp41PrintError> {
        match self.file.read(buf) {
            // 0 when VTIME expired with no data
            Ok(n) => Ok(Some(n)),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
                ) =>
            {
                Ok(Some(0))
            }
            Err(e) => Err(Hp41PrintError::Transport(format!(
                "Read from {} failed: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.dtr {
            if let Err(e) = set_dtr(&self.file, false) {
                warn!("failed to drop DTR on {}: {}", self.path.display(), e);
            }
        }
        info!("closed {}", self.path.display());
    }
}

fn parity_letter(parity: Parity) -> char {
    match parity {
        Parity::None => 'N',
        Parity::Even => 'E',
        Parity::Odd => 'O',
    }
}

// ============================================================================
// TTY SETUP
// ============================================================================

/// Open without becoming the controlling terminal and without waiting for
/// carrier, then switch back to blocking reads.
#[cfg(unix)]
fn open_device(path: &Path) -> io::Result<File> {
    use std::fs::OpenOptions;
    use std::os::unix::fs::OpenOptionsExt;
    use std::os::unix::io::AsRawFd;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
        .open(path)?;

    let fd = file.as_raw_fd();
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 || unsafe { libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(file)
}

#[cfg(not(unix))]
fn open_device(_path: &Path) -> io::Result<File> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "serial devices are only supported on Unix",
    ))
}

/// Configure the TTY for raw reads with the requested framing.
#[cfg(unix)]
fn configure_tty(file: &File, config: &SerialConfig) -> Result<(), Hp41PrintError> {
    use std::mem::MaybeUninit;
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();
    let speed = baud_speed(config.baud_rate).ok_or_else(|| {
        Hp41PrintError::Config(format!(
            "baud rate {} is not supported on this platform",
            config.baud_rate
        ))
    })?;

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(Hp41PrintError::Transport(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);

    termios.c_oflag &= !libc::OPOST;

    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);

    termios.c_cflag &= !(libc::CSIZE | libc::PARENB | libc::PARODD | libc::CSTOPB);
    termios.c_cflag |= libc::CLOCAL | libc::CREAD;
    termios.c_cflag |= match config.data_bits {
        5 => libc::CS5,
        6 => libc::CS6,
        7 => libc::CS7,
        _ => libc::CS8,
    };
    if config.stop_bits == 2 {
        termios.c_cflag |= libc::CSTOPB;
    }
    match config.parity {
        Parity::None => {}
        Parity::Even => termios.c_cflag |= libc::PARENB,
        Parity::Odd => termios.c_cflag |= libc::PARENB | libc::PARODD,
    }

    termios.c_cc[libc::VMIN] = 0;
    termios.c_cc[libc::VTIME] = READ_TIMEOUT_DECISECONDS;

    let result = unsafe {
        libc::cfsetispeed(&mut termios, speed) | libc::cfsetospeed(&mut termios, speed)
    };
    if result != 0 {
        return Err(Hp41PrintError::Transport(format!(
            "cfsetspeed failed: {}",
            io::Error::last_os_error()
        )));
    }

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(Hp41PrintError::Transport(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    debug!("configured tty fd {}", fd);
    Ok(())
}

#[cfg(not(unix))]
fn configure_tty(_file: &File, _config: &SerialConfig) -> Result<(), Hp41PrintError> {
    Err(Hp41PrintError::Transport(
        "TTY configuration not supported on this platform".to_string(),
    ))
}

/// Linux encodes speeds as `Bnnn` constants.
#[cfg(target_os = "linux")]
fn baud_speed(baud: u32) -> Option<libc::speed_t> {
    let speed = match baud {
        300 => libc::B300,
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        460800 => libc::B460800,
        921600 => libc::B921600,
        _ => return None,
    };
    Some(speed)
}

/// BSD-derived systems take the rate itself.
#[cfg(all(unix, not(target_os = "linux")))]
fn baud_speed(baud: u32) -> Option<libc::speed_t> {
    Some(baud as libc::speed_t)
}

#[cfg(unix)]
fn set_dtr(file: &File, on: bool) -> Result<(), Hp41PrintError> {
    use std::os::unix::io::AsRawFd;

    let bits: libc::c_int = libc::TIOCM_DTR;
    let result = if on {
        unsafe { libc::ioctl(file.as_raw_fd(), libc::TIOCMBIS, &bits) }
    } else {
        unsafe { libc::ioctl(file.as_raw_fd(), libc::TIOCMBIC, &bits) }
    };
    if result != 0 {
        return Err(Hp41PrintError::Transport(format!(
            "DTR {} failed: {}",
            if on { "assert" } else { "clear" },
            io::Error::last_os_error()
        )));
    }
    debug!("DTR {}", if on { "asserted" } else { "cleared" });
    Ok(())
}

#[cfg(not(unix))]
fn set_dtr(_file: &File, _on: bool) -> Result<(), Hp41PrintError> {
    Err(Hp41PrintError::Transport(
        "DTR control not supported on this platform".to_string(),
    ))
}

// ============================================================================
// PORT DISCOVERY
// ============================================================================

/// Whether a device file name looks like a serial port.
pub fn is_candidate_port(name: &str) -> bool {
    PORT_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// List serial ports under `/dev`, sorted by path.
pub fn list_ports() -> Result<Vec<PathBuf>, Hp41PrintError> {
    list_ports_in(DEVICE_DIR)
}

/// List serial ports in `dir`, sorted by path.
pub fn list_ports_in<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, Hp41PrintError> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|e| {
        Hp41PrintError::Transport(format!("Failed to scan {}: {}", dir.display(), e))
    })?;

    let mut ports: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_str().is_some_and(is_candidate_port))
        .map(|entry| entry.path())
        .collect();
    ports.sort();

    debug!("found {} serial ports in {}", ports.len(), dir.display());
    Ok(ports)
}

/// Pick the default port: the first USB serial adapter, else the first port.
pub fn preferred_port(ports: &[PathBuf]) -> Option<&PathBuf> {
    ports
        .iter()
        .find(|p| p.to_string_lossy().contains(PREFERRED_PORT_HINT))
        .or_else(|| ports.first())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_ports() {
        assert!(is_candidate_port("ttyUSB0"));
        assert!(is_candidate_port("ttyACM1"));
        assert!(is_candidate_port("rfcomm0"));
        assert!(is_candidate_port("cu.usbserial-00301314"));
        assert!(!is_candidate_port("tty1"));
        assert!(!is_candidate_port("null"));
        assert!(!is_candidate_port("tty.usbserial-00301314"));
    }

    #[test]
    fn test_preferred_port_picks_usbserial() {
        let ports = vec![
            PathBuf::from("/dev/cu.Bluetooth-Incoming-Port"),
            PathBuf::from("/dev/cu.usbserial-00301314"),
        ];
        assert_eq!(
            preferred_port(&ports),
            Some(&PathBuf::from("/dev/cu.usbserial-00301314"))
        );
    }

    #[test]
    fn test_preferred_port_falls_back_to_first() {
        let ports = vec![PathBuf::from("/dev/ttyACM0"), PathBuf::from("/dev/ttyUSB0")];
        assert_eq!(preferred_port(&ports), Some(&PathBuf::from("/dev/ttyACM0")));
        assert_eq!(preferred_port(&[]), None);
    }

    #[test]
    fn test_list_ports_in_directory() {
        let dir = std::env::temp_dir().join(format!("hp41print-ports-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        for name in ["ttyUSB1", "ttyUSB0", "zero", "ttyACM0"] {
            File::create(dir.join(name)).unwrap();
        }

        let ports = list_ports_in(&dir).unwrap();
        let names: Vec<_> = ports
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["ttyACM0", "ttyUSB0", "ttyUSB1"]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_list_ports_missing_directory() {
        assert!(matches!(
            list_ports_in("/nonexistent/hp41print"),
            Err(Hp41PrintError::Transport(_))
        ));
    }

    #[test]
    fn test_open_nonexistent_device() {
        let err = SerialTransport::open("/dev/nonexistent_hp41print_port", &SerialConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("nonexistent_hp41print_port"));
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let config = SerialConfig {
            data_bits: 4,
            ..Default::default()
        };
        assert!(matches!(
            SerialTransport::open("/dev/null", &config),
            Err(Hp41PrintError::Config(_))
        ));
    }
}
