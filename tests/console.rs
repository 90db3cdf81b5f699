//! Console tests driven by scripted input against a live server.

use std::net::SocketAddr;
use std::time::Duration;

use rpcd::config::AppConfig;
use rpcd::console::{Catalog, Console, ConsoleExit};
use rpcd::context::ServerContext;
use rpcd::functions::Registry;
use rpcd::rpc::{RpcClient, RpcServer, Shutdown, ShutdownReason};
use tokio::task::JoinHandle;
use tokio::time::timeout;

async fn start_server() -> (SocketAddr, Shutdown, JoinHandle<ShutdownReason>) {
    let config = AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..Default::default()
    };
    let server = RpcServer::bind(ServerContext::new(config, Registry::builtin()))
        .await
        .unwrap();
    let addr = server.local_addr();
    let shutdown = server.shutdown_handle();
    (addr, shutdown, tokio::spawn(server.run()))
}

/// Run a console over `script` and return how it ended plus everything it printed.
async fn run_script(addr: SocketAddr, script: &str) -> (ConsoleExit, String) {
    let client = RpcClient::connect(&addr.to_string()).await.unwrap();
    let mut output = Vec::new();

    let exit = {
        let console = Console::new(client, Catalog::builtin(), script.as_bytes(), &mut output);
        timeout(Duration::from_secs(5), console.run())
            .await
            .expect("console did not finish")
            .unwrap()
    };

    (exit, String::from_utf8(output).unwrap())
}

#[tokio::test]
async fn test_calls_render_results_and_errors() {
    let (addr, shutdown, handle) = start_server().await;

    let script = "validAnagram\nlisten\nsilent\nnroot\n-8\n2\nsort\ncherry apple banana\nexit\n";
    let (exit, output) = run_script(addr, script).await;

    assert_eq!(exit, ConsoleExit::UserExit);
    assert!(output.contains("=== Available functions ==="));
    assert!(output.contains("result: true (bool)"));
    assert!(output.contains("error: even root"));
    assert!(output.contains(r#"result: ["apple","banana","cherry"] (list)"#));
    assert!(output.contains("with request id 3"));

    shutdown.trigger(ShutdownReason::Requested);
    handle.await.unwrap();
}

#[tokio::test]
async fn test_unknown_command_and_help_reprompt() {
    let (addr, shutdown, handle) = start_server().await;

    let (exit, output) = run_script(addr, "launch\nHELP\nreverse\nabc\nexit\n").await;

    assert_eq!(exit, ConsoleExit::UserExit);
    assert!(output.contains("error: unknown function 'launch'"));
    assert_eq!(output.matches("=== Available functions ===").count(), 2);
    assert!(output.contains("result: cba (str)"));
    // The unknown command never reached the server.
    assert!(output.contains("with request id 1"));

    shutdown.trigger(ShutdownReason::Requested);
    handle.await.unwrap();
}

#[tokio::test]
async fn test_bad_parameter_is_asked_again() {
    let (addr, shutdown, handle) = start_server().await;

    let (_, output) = run_script(addr, "nroot\n16\nabc\n2.5\n2\nexit\n").await;

    assert_eq!(output.matches("error: expected int").count(), 2);
    assert_eq!(output.matches("x (float): ").count(), 1);
    assert!(output.contains("sending nroot(16.0, 2)"));
    assert!(output.contains("result: 4.0 (float)"));

    shutdown.trigger(ShutdownReason::Requested);
    handle.await.unwrap();
}

#[tokio::test]
async fn test_end_of_input_ends_console() {
    let (addr, shutdown, handle) = start_server().await;

    let (exit, _) = run_script(addr, "floor\n").await;
    assert_eq!(exit, ConsoleExit::InputClosed);

    shutdown.trigger(ShutdownReason::Requested);
    handle.await.unwrap();
}

#[tokio::test]
async fn test_server_shutdown_reports_disconnect() {
    let (addr, shutdown, handle) = start_server().await;
    let client = RpcClient::connect(&addr.to_string()).await.unwrap();

    shutdown.trigger(ShutdownReason::Requested);
    handle.await.unwrap();

    let mut output = Vec::new();
    let console = Console::new(
        client,
        Catalog::builtin(),
        "reverse\nabc\nreverse\nxyz\n".as_bytes(),
        &mut output,
    );
    let exit = timeout(Duration::from_secs(5), console.run())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(exit, ConsoleExit::Disconnected);
    let output = String::from_utf8(output).unwrap();
    assert!(output.contains("disconnected from server"));
    assert!(!output.contains("xyz"));
}
