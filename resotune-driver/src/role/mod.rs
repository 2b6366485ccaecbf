mod coprocessor;
mod dut;

use derive_more::Display;

pub use coprocessor::{parse_rgb, Coprocessor, CoprocessorCommand};
pub use dut::{Dut, DutCommand, ALL_TAPS_SHORTED};

/// Direction of a command as seen from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Direction {
    /// The host sends a zero-filled payload and receives the value.
    #[display("read")]
    Read,
    /// The host sends a value and receives the acknowledgment.
    #[display("write")]
    Write,
}

/// Payload shape of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Shape {
    /// Little-endian `u32`.
    #[display("u32")]
    U32,
    /// Little-endian `f32`.
    #[display("f32")]
    F32,
    /// Four raw bytes.
    #[display("[u8; 4]")]
    Bytes4,
    /// Length frame followed by a raw payload and an 8-byte acknowledgment.
    #[display("text")]
    Text,
    /// Length frame answered by that many raw bytes.
    #[display("buffer")]
    Buffer,
}

/// An entry of a role's command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    /// Symbolic name.
    pub name: &'static str,
    /// Command id carried in the lower 31 bits of the command word.
    pub id: u32,
    /// Direction.
    pub direction: Direction,
    /// Payload shape.
    pub shape: Shape,
}

impl CommandSpec {
    pub(crate) const fn new(name: &'static str, id: u32, direction: Direction, shape: Shape) -> Self {
        Self {
            name,
            id,
            direction,
            shape,
        }
    }
}

/// A symbolic command of a role.
pub trait Command: Copy + core::fmt::Debug + PartialEq + Eq + Send + Sync + 'static {
    /// Every command of the role, in table order.
    const ALL: &'static [Self];

    /// Returns the table entry of the command.
    #[must_use]
    fn spec(self) -> CommandSpec;
}

/// A remote endpoint reachable through a [`Device`].
///
/// [`Device`]: crate::device::Device
pub trait Role: Send + Sync + 'static {
    /// Name used in logs.
    const NAME: &'static str;
    /// Default serial port of the endpoint.
    const DEFAULT_PORT: &'static str;
    /// Default baud rate of the endpoint.
    const DEFAULT_BAUD: u32;
    /// Command table of the endpoint.
    const TABLE: &'static [CommandSpec];

    /// Typed commands of the endpoint.
    type Command: Command;

    /// Looks up a table entry by command id.
    #[must_use]
    fn lookup(id: u32) -> Option<&'static CommandSpec> {
        Self::TABLE.iter().find(|spec| spec.id == id)
    }

    /// Looks up a typed command by command id.
    #[must_use]
    fn command(id: u32) -> Option<Self::Command> {
        <Self::Command as Command>::ALL
            .iter()
            .copied()
            .find(|cmd| cmd.spec().id == id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn ids<R: Role>() -> HashSet<u32> {
        R::TABLE.iter().map(|spec| spec.id).collect()
    }

    #[test]
    fn tables_are_disjoint() {
        let coprocessor = ids::<Coprocessor>();
        let dut = ids::<Dut>();
        assert_eq!(Coprocessor::TABLE.len(), coprocessor.len());
        assert_eq!(Dut::TABLE.len(), dut.len());
        assert!(coprocessor.is_disjoint(&dut));
    }

    #[test]
    fn ids_fit_in_command_word() {
        Coprocessor::TABLE
            .iter()
            .chain(Dut::TABLE.iter())
            .for_each(|spec| {
                assert!(spec.id <= resotune_core::frame::CommandWord::MAX_ID);
            });
    }

    #[rstest::rstest]
    #[case(Some(CoprocessorCommand::MeasureAdcHs.spec()), 10)]
    #[case(Some(CoprocessorCommand::SetVdut.spec()), 1)]
    #[case(None, 0)]
    #[case(None, 0x101)]
    #[test]
    fn lookup_coprocessor(#[case] expect: Option<CommandSpec>, #[case] id: u32) {
        assert_eq!(expect.as_ref(), Coprocessor::lookup(id));
    }

    fn table_matches_commands<R: Role>() {
        assert_eq!(R::TABLE.len(), <R::Command as Command>::ALL.len());
        R::TABLE
            .iter()
            .zip(<R::Command as Command>::ALL)
            .for_each(|(spec, cmd)| {
                assert_eq!(*spec, cmd.spec());
                assert_eq!(Some(*cmd), R::command(spec.id));
            });
    }

    #[test]
    fn tables_match_commands() {
        table_matches_commands::<Coprocessor>();
        table_matches_commands::<Dut>();
        assert_eq!(None, Dut::command(1));
    }

    #[test]
    fn display() {
        assert_eq!("write", Direction::Write.to_string());
        assert_eq!("[u8; 4]", Shape::Bytes4.to_string());
    }
}
