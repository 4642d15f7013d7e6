//! Method registry
//!
//! Wire tokens for target classes and methods, plus the status sentinels.
//! Client and server must agree on every string here; the client never
//! puts a token on the wire that is not listed in this module.

use std::fmt;

/// Marks a failed call: `EXCEPTION <method> <message>`
pub const EXCEPTION_TOKEN: &str = "EXCEPTION";

/// Successful completion acknowledged by the client-side API layer
pub const CLIENT_OK_TOKEN: &str = "CLIENT_OK";

/// Successful completion acknowledged by the server
pub const SERVER_OK_TOKEN: &str = "SERVER_OK";

// =============================================================================
// Class Tokens
// =============================================================================

/// Remote class a command is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassToken {
    /// The server process itself (file transfer, housekeeping)
    Server,
    /// Controller/device access
    Device,
    /// FITS file handling (executed server-side)
    FitsFile,
    /// TIFF file handling (executed server-side)
    TiffFile,
    /// Image buffer utilities
    Image,
    /// Image deinterlacing
    Deinterlace,
}

impl ClassToken {
    pub const ALL: [ClassToken; 6] = [
        ClassToken::Server,
        ClassToken::Device,
        ClassToken::FitsFile,
        ClassToken::TiffFile,
        ClassToken::Image,
        ClassToken::Deinterlace,
    ];

    /// The exact wire string for this class
    pub fn token(&self) -> &'static str {
        match self {
            ClassToken::Server => "Server",
            ClassToken::Device => "Device",
            ClassToken::FitsFile => "FitsFile",
            ClassToken::TiffFile => "TiffFile",
            ClassToken::Image => "Image",
            ClassToken::Deinterlace => "Deinterlace",
        }
    }

    /// Look up a class by its wire string
    pub fn from_token(token: &str) -> Option<ClassToken> {
        Self::ALL.iter().copied().find(|c| c.token() == token)
    }
}

impl fmt::Display for ClassToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

// =============================================================================
// Method Tokens
// =============================================================================

macro_rules! methods {
    ($($variant:ident => $token:literal),+ $(,)?) => {
        /// Remote method a command invokes
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Method {
            $($variant,)+
        }

        impl Method {
            pub const ALL: &'static [Method] = &[$(Method::$variant,)+];

            /// The exact wire string for this method
            pub fn token(&self) -> &'static str {
                match self {
                    $(Method::$variant => $token,)+
                }
            }
        }
    };
}

methods! {
    // Server housekeeping
    SendFile => "SendFile",
    Version => "Version",

    // Device
    ToString => "ToString",
    GetDeviceList => "GetDeviceList",
    IsOpen => "IsOpen",
    Open => "Open",
    Close => "Close",
    Reset => "Reset",
    MapCommonBuffer => "MapCommonBuffer",
    UnMapCommonBuffer => "UnMapCommonBuffer",
    GetCommonBufferProperties => "GetCommonBufferProperties",
    Command => "Command",
    GetControllerId => "GetControllerId",
    ResetController => "ResetController",
    HasValidControllerId => "HasValidControllerId",
    LoadControllerFile => "LoadControllerFile",
    SetImageSize => "SetImageSize",
    GetImageRows => "GetImageRows",
    GetImageCols => "GetImageCols",
    Expose => "Expose",
    StopExposure => "StopExposure",
    IsReadout => "IsReadout",
    GetPixelCount => "GetPixelCount",
    ContainsError => "ContainsError",

    // FITS / TIFF
    WriteFitsKeyword => "WriteFitsKeyword",
    UpdateFitsKeyword => "UpdateFitsKeyword",
    GetFitsHeader => "GetFitsHeader",
    GetFitsParameters => "GetFitsParameters",
    WriteTiff => "WriteTiff",

    // Image
    GetDirectoryList => "GetDirectoryList",
    Deinterlace => "RunAlg",
}

impl Method {
    /// Look up a method by its wire string
    pub fn from_token(token: &str) -> Option<Method> {
        Self::ALL.iter().copied().find(|m| m.token() == token)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Immutable set of status sentinels shared by client and server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRegistry {
    exception: &'static str,
    client_ok: &'static str,
    server_ok: &'static str,
}

impl MethodRegistry {
    pub const fn new() -> Self {
        Self {
            exception: EXCEPTION_TOKEN,
            client_ok: CLIENT_OK_TOKEN,
            server_ok: SERVER_OK_TOKEN,
        }
    }

    pub fn exception(&self) -> &'static str {
        self.exception
    }

    pub fn client_ok(&self) -> &'static str {
        self.client_ok
    }

    pub fn server_ok(&self) -> &'static str {
        self.server_ok
    }

    /// True for either ok sentinel
    pub fn is_ok_token(&self, token: &str) -> bool {
        token == self.client_ok || token == self.server_ok
    }

    /// True only for the exact exception sentinel
    pub fn is_exception_token(&self, token: &str) -> bool {
        token == self.exception
    }

    /// Resolve a logical method name to its method
    pub fn lookup(&self, name: &str) -> Option<Method> {
        Method::from_token(name)
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}
