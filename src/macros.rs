//! Declarative helpers for protocol tables.

/// Defines numeric error-code constants together with `get_error_message`.
macro_rules! define_error_codes {
    ($($name:ident = $code:literal => $msg:expr),* $(,)?) => {
        $(pub const $name: u32 = $code;)*

        /// Returns the human-readable message for a numeric error code.
        pub fn get_error_message(code: u32) -> &'static str {
            match code {
                $($code => $msg,)*
                _ => "Unknown Error",
            }
        }
    };
}

/// Defines the `CommandType` enum with its byte conversions.
macro_rules! define_command_type {
    ($($name:ident = $val:literal),* $(,)?) => {
        /// Command byte carried in a frame header.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum CommandType {
            $($name = $val,)*
        }

        impl CommandType {
            pub fn from_u8(val: u8) -> Option<Self> {
                match val {
                    $($val => Some(CommandType::$name),)*
                    _ => None,
                }
            }

            pub fn as_u8(self) -> u8 {
                self as u8
            }
        }
    };
}
