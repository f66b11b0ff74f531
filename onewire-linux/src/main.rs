use clap::Parser;
use linux_embedded_hal::CdevPin;
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use onewire_bitbang::GpioMaster;
use onewire_bus::{OneWireError, OneWireSearch};

/// Highest device count the enumeration accounts for.
const MAX_DEVICES: usize = 16;

/// Enumerate a bit-banged 1-Wire bus on a Linux GPIO line
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the GPIO character device (e.g., /dev/gpiochip0)
    #[arg(short, long)]
    chip: String,

    /// Line offset of the bus pin on that chip
    #[arg(short, long)]
    line: u32,
}

fn main() {
    // Initialize the logger
    env_logger::init();
    // Parse command line arguments
    let args = Args::parse();
    // Open the bus pin as an open-drain output
    let mut chip = Chip::new(&args.chip).expect("Failed to open GPIO chip");
    let handle = chip
        .get_line(args.line)
        .expect("Failed to get GPIO line")
        .request(
            LineRequestFlags::OUTPUT | LineRequestFlags::OPEN_DRAIN,
            1,
            "onewire",
        )
        .expect("Failed to request GPIO line");
    let pin = CdevPin::new(handle).expect("Failed to wrap GPIO line");
    // Create a bus master on the pin
    let mut master = GpioMaster::new(pin, linux_embedded_hal::Delay);
    // Enumerate devices on the 1-Wire bus
    match OneWireSearch::new(&mut master).collect_all::<MAX_DEVICES>() {
        Ok(devices) => {
            log::info!("Found {} devices", devices.len());
            for rom in devices.iter() {
                if rom.is_checksum_valid() {
                    log::info!("ROM: {rom}");
                } else {
                    log::warn!("ROM: {rom} (identifier checksum invalid)");
                }
            }
        }
        Err(OneWireError::NoDevicePresent) => log::info!("Found 0 devices"),
        Err(error) => panic!("Search failed: {error:?}"),
    }
}
