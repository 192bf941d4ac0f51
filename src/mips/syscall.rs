use crate::mips::{arch::REG_V0, machine::Machine, memory::Bus};

/// Register snapshot handed to the embedder when SYSCALL retires:
/// `$v0` selects the service, `$a0..$a3` carry the arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallRequest {
    pub code: u32,
    pub args: [u32; 4],
}

impl SyscallRequest {
    pub fn a0(&self) -> u32 { self.args[0] }
    pub fn a1(&self) -> u32 { self.args[1] }
}

/// What the machine does once the handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallOutcome {
    /// Advance past the SYSCALL.
    Continue,
    /// Pause with PC still on the SYSCALL; it runs again after `resume()`.
    Suspend,
    /// Advance and stop the machine.
    Stop,
}

pub trait SyscallHandler {
    fn syscall(&mut self, req: SyscallRequest, machine: &mut Machine) -> SyscallOutcome;
}

impl<F> SyscallHandler for F
where
    F: FnMut(SyscallRequest, &mut Machine) -> SyscallOutcome,
{
    fn syscall(&mut self, req: SyscallRequest, machine: &mut Machine) -> SyscallOutcome {
        self(req, machine)
    }
}

const EOT: u8 = 0x04;

/// Console services over in-memory buffers.
///
/// Codes: 1 print int, 4 print string, 5 read int, 8 read string,
/// 10 exit, 11 print char. Reads suspend the machine until enough input
/// has been fed.
#[derive(Debug, Default, Clone)]
pub struct BufferedConsole {
    /// emulated input (STDIN)
    pub stdin: Vec<u8>,
    /// emulated output (STDOUT)
    pub stdout: Vec<u8>,
}

impl BufferedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, input: &[u8]) {
        self.stdin.extend_from_slice(input);
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn take_output(&mut self) -> String {
        let out = self.output();
        self.stdout.clear();
        out
    }

    fn print_string(&mut self, machine: &Machine, mut addr: u32) {
        loop {
            match machine.memory().load8(addr) {
                Ok(0) => break,
                Ok(b) => self.stdout.push(b),
                Err(e) => {
                    log::warn!("print string stopped: {e}");
                    break;
                }
            }
            addr = addr.wrapping_add(1);
        }
    }

    /// Parses `[ws][-]digits<terminator>`; `None` until a terminator is buffered.
    fn read_int(&mut self) -> Option<u32> {
        let mut i = 0;
        while i < self.stdin.len() && self.stdin[i].is_ascii_whitespace() {
            i += 1;
        }
        let negative = self.stdin.get(i) == Some(&b'-');
        if negative {
            i += 1;
        }
        let mut value: i64 = 0;
        while let Some(b) = self.stdin.get(i).filter(|b| b.is_ascii_digit()) {
            value = value.wrapping_mul(10).wrapping_add((b - b'0') as i64);
            i += 1;
        }
        // the terminator itself is consumed too
        self.stdin.get(i)?;
        self.stdin.drain(..=i);
        let value = if negative { value.wrapping_neg() } else { value };
        Some(value as u32)
    }

    /// Collects at most `max - 1` bytes, stopping after a newline or at EOT.
    fn read_line(&mut self, max: u32) -> Option<Vec<u8>> {
        let limit = max.saturating_sub(1) as usize;
        let mut line = Vec::new();
        let mut consumed = 0;
        let mut done = limit == 0;
        while !done {
            let &b = self.stdin.get(consumed)?;
            consumed += 1;
            if b == EOT {
                break;
            }
            line.push(b);
            done = b == b'\n' || line.len() == limit;
        }
        self.stdin.drain(..consumed);
        Some(line)
    }
}

impl SyscallHandler for BufferedConsole {
    fn syscall(&mut self, req: SyscallRequest, machine: &mut Machine) -> SyscallOutcome {
        match req.code {
            1 => self.stdout.extend_from_slice((req.a0() as i32).to_string().as_bytes()),
            4 => self.print_string(machine, req.a0()),
            5 => match self.read_int() {
                Some(v) => machine.registers_mut().set(REG_V0, v),
                None => return SyscallOutcome::Suspend,
            },
            8 => {
                let max = req.a1();
                if max == 0 {
                    return SyscallOutcome::Continue;
                }
                let Some(mut line) = self.read_line(max) else {
                    return SyscallOutcome::Suspend;
                };
                line.push(0);
                if let Err(e) = crate::mips::loader::load_bytes(machine.memory_mut(), req.a0(), &line) {
                    log::warn!("read string dropped: {e}");
                }
            }
            10 => return SyscallOutcome::Stop,
            11 => self.stdout.push(req.a0() as u8),
            code => log::warn!("unhandled syscall {code}"),
        }
        SyscallOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mips::arch::{RAM_BASE, REG_A0};
    use crate::mips::config::MachineConfig;

    fn req(code: u32, a0: u32, a1: u32) -> SyscallRequest {
        SyscallRequest { code, args: [a0, a1, 0, 0] }
    }

    #[test]
    fn prints_numbers_chars_and_strings() {
        let mut m = Machine::new(MachineConfig::compact());
        crate::mips::loader::load_bytes(m.memory_mut(), RAM_BASE, b"hi\0").unwrap();
        let mut con = BufferedConsole::new();
        con.syscall(req(1, (-42i32) as u32, 0), &mut m);
        con.syscall(req(11, b' ' as u32, 0), &mut m);
        con.syscall(req(4, RAM_BASE, 0), &mut m);
        assert_eq!(con.take_output(), "-42 hi");
        assert!(con.stdout.is_empty());
    }

    #[test]
    fn exit_stops() {
        let mut m = Machine::new(MachineConfig::compact());
        assert_eq!(BufferedConsole::new().syscall(req(10, 0, 0), &mut m), SyscallOutcome::Stop);
    }

    #[test]
    fn read_int_waits_for_terminator() {
        let mut m = Machine::new(MachineConfig::compact());
        let mut con = BufferedConsole::new();
        con.feed(b"  12");
        assert_eq!(con.syscall(req(5, 0, 0), &mut m), SyscallOutcome::Suspend);
        assert_eq!(con.stdin, b"  12");
        con.feed(b"3\nrest");
        assert_eq!(con.syscall(req(5, 0, 0), &mut m), SyscallOutcome::Continue);
        assert_eq!(m.registers().get(REG_V0), 123);
        assert_eq!(con.stdin, b"rest");
    }

    #[test]
    fn read_int_accepts_negatives() {
        let mut m = Machine::new(MachineConfig::compact());
        let mut con = BufferedConsole::new();
        con.feed(b"-7 ");
        con.syscall(req(5, 0, 0), &mut m);
        assert_eq!(m.registers().get(REG_V0) as i32, -7);
    }

    #[test]
    fn read_string_honours_limit_and_newline() {
        let mut m = Machine::new(MachineConfig::compact());
        let mut con = BufferedConsole::new();
        con.feed(b"abcdef");
        assert_eq!(con.syscall(req(8, RAM_BASE, 4), &mut m), SyscallOutcome::Continue);
        assert_eq!(&m.memory().ram[..4], b"abc\0");
        assert_eq!(con.stdin, b"def");

        con.stdin.clear();
        con.feed(b"x\ny");
        con.syscall(req(8, RAM_BASE + 16, 10), &mut m);
        assert_eq!(&m.memory().ram[16..19], b"x\n\0");
        assert_eq!(con.stdin, b"y");
    }

    #[test]
    fn read_string_suspends_and_drops_eot() {
        let mut m = Machine::new(MachineConfig::compact());
        let mut con = BufferedConsole::new();
        con.feed(b"ab");
        assert_eq!(con.syscall(req(8, RAM_BASE, 10), &mut m), SyscallOutcome::Suspend);
        con.feed(&[EOT]);
        assert_eq!(con.syscall(req(8, RAM_BASE, 10), &mut m), SyscallOutcome::Continue);
        assert_eq!(&m.memory().ram[..3], b"ab\0");
        assert!(con.stdin.is_empty());
    }

    #[test]
    fn closures_are_handlers() {
        let mut m = Machine::new(MachineConfig::compact());
        let mut seen = Vec::new();
        let mut handler = |r: SyscallRequest, m: &mut Machine| {
            seen.push(r.code);
            m.registers_mut().set(REG_A0, 9);
            SyscallOutcome::Continue
        };
        handler.syscall(req(42, 0, 0), &mut m);
        assert_eq!(seen, [42]);
        assert_eq!(m.registers().get(REG_A0), 9);
    }
}
