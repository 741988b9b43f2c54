use std::fmt;

pub type Result<T> = core::result::Result<T, Error>;

/// Conditions that stop the decompressor. Once one is returned the
/// decompressor is unusable and should be dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The source ran dry and has nothing more to give.
    CantSuspend,
    NotJpeg(u8, u8),
    BadLength(u16),
    DuplicateSoi,
    DuplicateSof,
    DuplicateComponent(u8),
    SosBeforeSof,
    EoiExpected,
    SofUnsupported(u8),
    UnknownMarker(u8),
    NoImage,
    EmptyImage,
    ImageTooBig(u32),
    BadPrecision(u8),
    ComponentCount(u8),
    BadSampling,
    BadMcuSize,
    BadComponentId(u8),
    BadDqtIndex(u8),
    BadDqtPrecision(u8),
    BadHuffTable,
    BadDhtIndex(u8),
    NoHuffTable(u8),
    NoQuantTable(u8),
    NotCompiled(&'static str),
    BadState(&'static str),
    AcRunOverflow,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::CantSuspend => write!(f, "Suspension not allowed here"),
            Error::NotJpeg(a, b) => {
                write!(f, "Not a JPEG file: starts with 0x{a:02x} 0x{b:02x}")
            }
            Error::BadLength(length) => write!(f, "Bogus marker length {length}"),
            Error::DuplicateSoi => write!(f, "Invalid JPEG file structure: two SOI markers"),
            Error::DuplicateSof => write!(f, "Invalid JPEG file structure: two SOF markers"),
            Error::DuplicateComponent(id) => write!(f, "Duplicate component identifier {id}"),
            Error::SosBeforeSof => write!(f, "Invalid JPEG file structure: SOS before SOF"),
            Error::EoiExpected => write!(f, "Didn't expect more than one scan"),
            Error::SofUnsupported(code) => {
                write!(f, "Unsupported JPEG process: SOF type 0x{code:02x}")
            }
            Error::UnknownMarker(code) => write!(f, "Unsupported marker type 0x{code:02x}"),
            Error::NoImage => write!(f, "JPEG datastream contains no image"),
            Error::EmptyImage => write!(f, "Empty JPEG image (DNL not supported)"),
            Error::ImageTooBig(max) => {
                write!(f, "Maximum supported image dimension is {max} pixels")
            }
            Error::BadPrecision(precision) => {
                write!(f, "Unsupported JPEG data precision {precision}")
            }
            Error::ComponentCount(count) => {
                write!(f, "Bogus number of color components: {count}")
            }
            Error::BadSampling => write!(f, "Bogus sampling factors"),
            Error::BadMcuSize => write!(f, "Sampling factors too large for interleaved scan"),
            Error::BadComponentId(id) => write!(f, "Invalid component ID {id} in SOS"),
            Error::BadDqtIndex(index) => write!(f, "Bogus DQT index {index}"),
            Error::BadDqtPrecision(precision) => {
                write!(f, "Bogus quantization table precision {precision}")
            }
            Error::BadHuffTable => write!(f, "Bogus Huffman table definition"),
            Error::BadDhtIndex(index) => write!(f, "Bogus DHT index {index}"),
            Error::NoHuffTable(index) => write!(f, "Huffman table 0x{index:02x} was not defined"),
            Error::NoQuantTable(index) => {
                write!(f, "Quantization table 0x{index:02x} was not defined")
            }
            Error::NotCompiled(what) => write!(f, "{what} not supported by this decoder"),
            Error::BadState(call) => write!(f, "Improper call to {call} in this state"),
            Error::AcRunOverflow => {
                write!(f, "Corrupt JPEG data: AC coefficient run past end of block")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Recoverable oddities. Decoding continues after each one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    ExtraneousData { count: usize, marker: u8 },
    HitMarker,
    HuffBadCode,
    NotSequential,
    MustResync { found: u8, expected: u8 },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::ExtraneousData { count, marker } => write!(
                f,
                "Corrupt JPEG data: {count} extraneous bytes before marker 0x{marker:02x}"
            ),
            Warning::HitMarker => write!(f, "Corrupt JPEG data: premature end of data segment"),
            Warning::HuffBadCode => write!(f, "Corrupt JPEG data: bad Huffman code"),
            Warning::NotSequential => write!(f, "Invalid SOS parameters for sequential JPEG"),
            Warning::MustResync { found, expected } => write!(
                f,
                "Corrupt JPEG data: found marker 0x{found:02x} instead of RST{expected}"
            ),
        }
    }
}

/// Collects warnings for one decompressor. Every warning is logged, only the
/// first is kept.
#[derive(Debug, Default)]
pub struct ErrorManager {
    num_warnings: usize,
    first_warning: Option<Warning>,
}

impl ErrorManager {
    pub fn warn(&mut self, warning: Warning) {
        log::warn!("{warning}");
        self.num_warnings += 1;
        if self.first_warning.is_none() {
            self.first_warning = Some(warning);
        }
    }

    pub fn num_warnings(&self) -> usize {
        self.num_warnings
    }

    pub fn first_warning(&self) -> Option<&Warning> {
        self.first_warning.as_ref()
    }
}
