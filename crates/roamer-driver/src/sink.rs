//! 指令输出
//!
//! 控制线程每个周期把一条 [`VelocityCommand`] 交给 [`CommandSink`]。
//! 实现必须是非阻塞的：控制周期内不允许等待执行器。
//! 唯一例外是退出前的零速指令（[`CommandSink::publish_final`]），它必须送达。

use crate::error::DriverError;
use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TrySendError, bounded};
use roamer_protocol::VelocityCommand;
use std::time::Duration;
use tracing::debug;

/// 零速指令等待通道空位的最长时间
pub const FINAL_SEND_TIMEOUT: Duration = Duration::from_millis(200);

/// 执行器侧的指令接收者
///
/// # 性能要求
///
/// - **非阻塞**: 禁止等待 I/O 或锁
/// - 推荐使用 `try_send`，失败时返回错误而不是重试
///
/// 控制线程只记录错误，不会因此停止。
pub trait CommandSink: Send {
    /// 输出一条速度指令
    fn publish(&mut self, command: VelocityCommand) -> Result<(), DriverError>;

    /// 输出退出前的最后一条指令
    ///
    /// 控制线程退出时只调用一次，允许有界等待。
    /// 实现应保证执行器最后收到的是这条指令，而不是排队中的旧指令。
    fn publish_final(&mut self, command: VelocityCommand) -> Result<(), DriverError> {
        self.publish(command)
    }
}

impl<T: CommandSink + ?Sized> CommandSink for Box<T> {
    fn publish(&mut self, command: VelocityCommand) -> Result<(), DriverError> {
        (**self).publish(command)
    }

    fn publish_final(&mut self, command: VelocityCommand) -> Result<(), DriverError> {
        (**self).publish_final(command)
    }
}

/// 基于 crossbeam 有界通道的输出
///
/// 通过 [`ChannelSink::bounded`] 创建时会保留一个接收端副本，
/// 退出时若通道已满，丢弃最旧的排队指令为零速指令腾出空位。
/// 副本存在时通道不会因外部接收端丢弃而断开，此时只会报告 `ChannelFull`。
///
/// # 示例
///
/// ```
/// use roamer_driver::sink::{ChannelSink, CommandSink};
/// use roamer_protocol::VelocityCommand;
///
/// let (mut sink, rx) = ChannelSink::bounded(4);
/// sink.publish(VelocityCommand::new(0.12, 0.0)).unwrap();
/// assert_eq!(rx.try_recv().unwrap().linear, 0.12);
/// ```
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<VelocityCommand>,
    drain: Option<Receiver<VelocityCommand>>,
}

impl ChannelSink {
    /// 包装已有的发送端（退出时无法清空旧指令，只能等待空位）
    pub fn new(tx: Sender<VelocityCommand>) -> Self {
        Self { tx, drain: None }
    }

    /// 创建通道并返回接收端
    pub fn bounded(capacity: usize) -> (Self, Receiver<VelocityCommand>) {
        let (tx, rx) = bounded(capacity);
        let sink = Self {
            tx,
            drain: Some(rx.clone()),
        };
        (sink, rx)
    }
}

impl CommandSink for ChannelSink {
    fn publish(&mut self, command: VelocityCommand) -> Result<(), DriverError> {
        // ✅ try_send：消费者跟不上时丢弃，不阻塞控制线程
        self.tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => DriverError::ChannelFull,
            TrySendError::Disconnected(_) => DriverError::ChannelClosed,
        })
    }

    fn publish_final(&mut self, command: VelocityCommand) -> Result<(), DriverError> {
        const MAX_EVICTIONS: usize = 8;

        if let Some(drain) = &self.drain {
            for _ in 0..MAX_EVICTIONS {
                match self.tx.try_send(command) {
                    Ok(()) => return Ok(()),
                    Err(TrySendError::Disconnected(_)) => return Err(DriverError::ChannelClosed),
                    Err(TrySendError::Full(_)) => {
                        if let Ok(stale) = drain.try_recv() {
                            debug!(?stale, "Discarded queued command before final command");
                        }
                    },
                }
            }
        }

        // 无接收端副本或其他发送端持续写入时，有界等待消费者腾出空位
        self.tx
            .send_timeout(command, FINAL_SEND_TIMEOUT)
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => DriverError::ChannelFull,
                SendTimeoutError::Disconnected(_) => DriverError::ChannelClosed,
            })
    }
}

/// 闭包输出
///
/// ```
/// use roamer_driver::sink::{CommandSink, FnSink};
/// use roamer_protocol::VelocityCommand;
///
/// let mut sink = FnSink::new(|cmd: VelocityCommand| {
///     assert!(cmd.is_stop());
///     Ok(())
/// });
/// sink.publish(VelocityCommand::STOP).unwrap();
/// ```
pub struct FnSink<F> {
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(VelocityCommand) -> Result<(), DriverError> + Send,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> CommandSink for FnSink<F>
where
    F: FnMut(VelocityCommand) -> Result<(), DriverError> + Send,
{
    fn publish(&mut self, command: VelocityCommand) -> Result<(), DriverError> {
        (self.f)(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_full() {
        let (mut sink, rx) = ChannelSink::bounded(1);
        sink.publish(VelocityCommand::new(0.12, 0.0)).unwrap();
        assert!(matches!(
            sink.publish(VelocityCommand::STOP),
            Err(DriverError::ChannelFull)
        ));

        // 第一条保留，第二条被丢弃
        assert_eq!(rx.try_recv().unwrap(), VelocityCommand::new(0.12, 0.0));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_closed() {
        let (tx, rx) = bounded(1);
        let mut sink = ChannelSink::new(tx);
        drop(rx);
        assert!(matches!(
            sink.publish(VelocityCommand::STOP),
            Err(DriverError::ChannelClosed)
        ));
        assert!(matches!(
            sink.publish_final(VelocityCommand::STOP),
            Err(DriverError::ChannelClosed)
        ));
    }

    #[test]
    fn test_final_command_replaces_queued_commands() {
        let (mut sink, rx) = ChannelSink::bounded(2);
        sink.publish(VelocityCommand::new(0.12, 0.0)).unwrap();
        sink.publish(VelocityCommand::new(0.12, 0.0)).unwrap();
        assert!(matches!(
            sink.publish(VelocityCommand::new(0.12, 0.0)),
            Err(DriverError::ChannelFull)
        ));

        sink.publish_final(VelocityCommand::STOP).unwrap();

        // 最旧的一条被挤出，零速指令排在最后
        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            received,
            vec![VelocityCommand::new(0.12, 0.0), VelocityCommand::STOP]
        );
    }

    #[test]
    fn test_final_command_keeps_queue_when_space_left() {
        let (mut sink, rx) = ChannelSink::bounded(4);
        sink.publish(VelocityCommand::new(0.0, 0.8)).unwrap();
        sink.publish(VelocityCommand::new(0.0, 0.8)).unwrap();
        sink.publish_final(VelocityCommand::STOP).unwrap();

        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(received.len(), 3);
        assert!(received[2].is_stop());
    }

    #[test]
    fn test_final_command_waits_for_consumer() {
        let (tx, rx) = bounded(1);
        let mut sink = ChannelSink::new(tx);
        sink.publish(VelocityCommand::new(0.12, 0.0)).unwrap();

        let consumer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            rx.iter().collect::<Vec<_>>()
        });
        sink.publish_final(VelocityCommand::STOP).unwrap();
        drop(sink);

        let received = consumer.join().unwrap();
        assert!(received.last().unwrap().is_stop());
    }

    #[test]
    fn test_final_command_times_out_without_consumer() {
        let (tx, _rx) = bounded(1);
        let mut sink = ChannelSink::new(tx);
        sink.publish(VelocityCommand::new(0.12, 0.0)).unwrap();
        assert!(matches!(
            sink.publish_final(VelocityCommand::STOP),
            Err(DriverError::ChannelFull)
        ));
    }

    #[test]
    fn test_fn_sink_collects() {
        let mut seen = Vec::new();
        {
            let mut sink = FnSink::new(|cmd| {
                seen.push(cmd);
                Ok(())
            });
            sink.publish(VelocityCommand::new(0.0, 0.8)).unwrap();
            sink.publish(VelocityCommand::STOP).unwrap();
        }
        assert_eq!(seen.len(), 2);
        assert!(seen[1].is_stop());
    }

    #[test]
    fn test_boxed_sink() {
        let (sink, rx) = ChannelSink::bounded(2);
        let mut boxed: Box<dyn CommandSink> = Box::new(sink);
        boxed.publish(VelocityCommand::new(0.0, 0.8)).unwrap();
        boxed.publish_final(VelocityCommand::STOP).unwrap();
        assert_eq!(rx.try_recv().unwrap(), VelocityCommand::new(0.0, 0.8));
        assert!(rx.try_recv().unwrap().is_stop());
    }
}
