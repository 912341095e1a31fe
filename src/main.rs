use chip8::{
    assemble, disassemble, spawn, BulkTransfer, Config, NullKeypad, Stopper, VirtualMachine,
};
use clap::{Parser, Subcommand};
use std::{fs, thread, time::Duration};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chip8")]
#[command(about = "CHIP-8 assembler and virtual machine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a source file into a program image
    Asm {
        /// Assembly source
        input: String,
        /// Where to write the program image
        output: String,
    },
    /// List the instructions of a program image
    Disasm {
        rom: String,
    },
    /// Run a program image headless and print the final screen and registers
    Run {
        rom: String,
        /// How long to run before stopping
        #[arg(short, long, default_value_t = 1000)]
        millis: u64,
        /// Instructions per second, 0 for unpaced
        #[arg(long, default_value_t = 500)]
        hz: u32,
        /// Store and load only V0..Vx instead of all registers
        #[arg(long)]
        bulk_through_x: bool,
        /// Seed for the random number instruction
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Asm { input, output } => {
            let source = fs::read_to_string(&input)?;
            let program = assemble(&source)?;
            fs::write(&output, &program)?;
            info!(input = %input, output = %output, bytes = program.len(), "assembled");
        }

        Commands::Disasm { rom } => {
            let program = fs::read(&rom)?;
            for line in disassemble(&program) {
                println!("{}", line);
            }
        }

        Commands::Run {
            rom,
            millis,
            hz,
            bulk_through_x,
            seed,
        } => {
            let program = fs::read(&rom)?;
            let mut config = Config::default().with_instruction_hz(hz);
            if bulk_through_x {
                config = config.with_bulk_transfer(BulkTransfer::ThroughX);
            }
            if let Some(seed) = seed {
                config = config.with_rng_seed(seed);
            }

            let vm = VirtualMachine::with_config(&program, NullKeypad, config)?;
            let handle = spawn(vm, Stopper::new());
            thread::sleep(Duration::from_millis(millis));
            let (vm, result) = handle.stop_and_join();

            println!("{}", vm.frame());
            let state = vm.state();
            println!(
                "PC: {:#05X}  SP: {}  I: {:#05X}  DT: {}  ST: {}",
                state.program_counter,
                state.stack_pointer,
                state.register_i,
                state.delay_timer,
                state.sound_timer
            );
            for (i, value) in state.registers.iter().enumerate() {
                println!("V{:X}: {:#04X}", i, value);
            }

            if let Err(err) = result {
                error!(%err, "program failed");
                return Err(err.into());
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
