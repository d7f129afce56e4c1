use crate::result::{invalid_encoding_error, IonResult};
use crate::types::IonType;

/// The high nibble of a binary type descriptor: one of the fifteen type codes defined by the
/// binary spec, including the codes that do not correspond to an [IonType] (NOP padding,
/// annotation wrappers, and the Ion Version Marker).
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum IonTypeCode {
    NullOrNop,        // 0
    Boolean,          // 1
    PositiveInteger,  // 2
    NegativeInteger,  // 3
    Float,            // 4
    Decimal,          // 5
    Timestamp,        // 6
    Symbol,           // 7
    String,           // 8
    Clob,             // 9
    Blob,             // 10
    List,             // 11
    SExpression,      // 12
    Struct,           // 13
    AnnotationOrIvm,  // 14
    Reserved,         // 15
}

impl IonTypeCode {
    /// Interprets the type code as an [IonType], if it has one.
    pub fn as_type(self) -> IonResult<IonType> {
        use IonTypeCode::*;
        let ion_type = match self {
            NullOrNop => IonType::Null,
            Boolean => IonType::Bool,
            PositiveInteger | NegativeInteger => IonType::Int,
            Float => IonType::Float,
            Decimal => IonType::Decimal,
            Timestamp => IonType::Timestamp,
            Symbol => IonType::Symbol,
            String => IonType::String,
            Clob => IonType::Clob,
            Blob => IonType::Blob,
            List => IonType::List,
            SExpression => IonType::SExp,
            Struct => IonType::Struct,
            AnnotationOrIvm | Reserved => {
                return invalid_encoding_error(
                    format!("type code {} does not correspond to an Ion type", u8::from(self)),
                    0,
                );
            }
        };
        Ok(ion_type)
    }

    pub fn from_u8(nibble: u8) -> IonResult<IonTypeCode> {
        use IonTypeCode::*;
        let type_code = match nibble {
            0 => NullOrNop,
            1 => Boolean,
            2 => PositiveInteger,
            3 => NegativeInteger,
            4 => Float,
            5 => Decimal,
            6 => Timestamp,
            7 => Symbol,
            8 => String,
            9 => Clob,
            10 => Blob,
            11 => List,
            12 => SExpression,
            13 => Struct,
            14 => AnnotationOrIvm,
            15 => Reserved,
            _ => {
                return invalid_encoding_error(
                    format!("{nibble} is not a valid type code nibble"),
                    0,
                );
            }
        };
        Ok(type_code)
    }
}

impl From<IonTypeCode> for u8 {
    fn from(code: IonTypeCode) -> u8 {
        use IonTypeCode::*;
        match code {
            NullOrNop => 0,
            Boolean => 1,
            PositiveInteger => 2,
            NegativeInteger => 3,
            Float => 4,
            Decimal => 5,
            Timestamp => 6,
            Symbol => 7,
            String => 8,
            Clob => 9,
            Blob => 10,
            List => 11,
            SExpression => 12,
            Struct => 13,
            AnnotationOrIvm => 14,
            Reserved => 15,
        }
    }
}

impl From<IonType> for IonTypeCode {
    fn from(ion_type: IonType) -> IonTypeCode {
        use IonTypeCode::*;
        match ion_type {
            IonType::Null => NullOrNop,
            IonType::Bool => Boolean,
            // The positive code doubles as the generic int code; writers pick the sign
            IonType::Int => PositiveInteger,
            IonType::Float => Float,
            IonType::Decimal => Decimal,
            IonType::Timestamp => Timestamp,
            IonType::Symbol => Symbol,
            IonType::String => String,
            IonType::Clob => Clob,
            IonType::Blob => Blob,
            IonType::List => List,
            IonType::SExp => SExpression,
            IonType::Struct => Struct,
        }
    }
}
