//! Tonbox firmware - main entry point
//!
//! Hardware-only entry point for STM32H743ZI.

#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::peripherals;
use embassy_stm32::spi::{Config as SpiConfig, Spi};
use embassy_stm32::time::Hertz;
use embassy_stm32::usart::{self, BufferedUart, Config as UartConfig};
use embassy_stm32::{bind_interrupts, dma::NoDma};
use embassy_time::{Delay, Duration, Instant, Ticker, Timer};
use embedded_hal_bus::spi::ExclusiveDevice;
use mfrc522::comm::blocking::spi::{DummyDelay, SpiInterface};
use mfrc522::Mfrc522;
use static_cell::StaticCell;

use activity::Board;
use firmware::{App, AppConfig, AppSignal, At24c, Geometry, Mfrc522Reader, PanelPins, Parts};
use platform::config::{APP_NAME, APP_VERSION, AUDIO_MODULE_BAUD, TICK_MS};
use playback::SequentialBranches;

use {defmt_rtt as _, panic_probe as _};

bind_interrupts!(struct Irqs {
    USART1 => usart::BufferedInterruptHandler<peripherals::USART1>;
    I2C1_EV => i2c::EventInterruptHandler<peripherals::I2C1>;
    I2C1_ER => i2c::ErrorInterruptHandler<peripherals::I2C1>;
});

/// 7-bit address of the settings EEPROM (A0..A2 tied low).
const EEPROM_ADDR: u8 = 0x50;

static UART_TX: StaticCell<[u8; 64]> = StaticCell::new();
static UART_RX: StaticCell<[u8; 64]> = StaticCell::new();

type RfidSpi = ExclusiveDevice<Spi<'static, peripherals::SPI1, NoDma, NoDma>, Output<'static>, Delay>;

struct Tonbox;

impl Board for Tonbox {
    type Serial = BufferedUart<'static, peripherals::USART1>;
    type Branches = SequentialBranches;
    type Nvs = At24c<I2c<'static, peripherals::I2C1, NoDma, NoDma>>;
    type Reader = Mfrc522Reader<SpiInterface<RfidSpi, DummyDelay>>;
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    defmt::info!("{=str} firmware v{=str}", APP_NAME, APP_VERSION);
    let p = embassy_stm32::init(embassy_stm32::Config::default());

    // Holds the supply latch on; released on standby.
    let mut power_hold = Output::new(p.PB0, Level::High, Speed::Low);

    // Audio module: USART1, PB6 = TX, PB7 = RX.
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = AUDIO_MODULE_BAUD;
    let serial = match BufferedUart::new(
        p.USART1,
        Irqs,
        p.PB7,
        p.PB6,
        UART_TX.init([0; 64]),
        UART_RX.init([0; 64]),
        uart_config,
    ) {
        Ok(serial) => serial,
        Err(e) => halt("audio module uart", e).await,
    };

    // Settings EEPROM: I2C1, PB8 = SCL, PB9 = SDA.
    let i2c = I2c::new(
        p.I2C1,
        p.PB8,
        p.PB9,
        Irqs,
        NoDma,
        NoDma,
        Hertz(100_000),
        i2c::Config::default(),
    );
    let nvs = At24c::new(i2c, EEPROM_ADDR, Geometry::AT24C32);

    // RFID: SPI1, PA5 = SCK, PA6 = MISO, PA7 = MOSI, PA4 = NSS.
    let mut spi_config = SpiConfig::default();
    spi_config.frequency = Hertz(1_000_000);
    let spi = Spi::new_blocking(p.SPI1, p.PA5, p.PA7, p.PA6, spi_config);
    let cs = Output::new(p.PA4, Level::High, Speed::VeryHigh);
    let spi_device = ExclusiveDevice::new(spi, cs, Delay).unwrap_or_else(|e| match e {});
    let reader = match Mfrc522::new(SpiInterface::new(spi_device)).init() {
        Ok(chip) => Mfrc522Reader::new(chip),
        Err(_) => halt("mfrc522 init", ()).await,
    };

    let mut buttons = PanelPins::new(
        Input::new(p.PA0, Pull::Up).degrade(),
        Input::new(p.PA1, Pull::Up).degrade(),
        Input::new(p.PA2, Pull::Up).degrade(),
    );

    let parts = Parts::<Tonbox> {
        serial,
        branches: SequentialBranches,
        nvs,
        reader,
    };
    let mut app = App::boot(parts, AppConfig::default(), Instant::now());

    let mut ticker = Ticker::every(Duration::from_millis(TICK_MS));
    loop {
        ticker.next().await;
        if app.tick(Instant::now(), buttons.sample()) == AppSignal::Standby {
            defmt::info!("standby: releasing power latch");
            power_hold.set_low();
        }
    }
}

async fn halt<E: defmt::Format>(what: &str, e: E) -> ! {
    defmt::error!("{=str} failed: {}", what, e);
    loop {
        Timer::after(Duration::from_secs(1)).await;
    }
}
